//! Newline-delimited JSON boundary.
//!
//! Each input line is one request `{"tool", "arguments", "session_id"?}`;
//! each produces exactly one envelope line. A line that cannot be parsed
//! yields a failure envelope, so the stream never desynchronizes. Only a
//! storage failure or an I/O error ends the loop.

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::envelope::ResultEnvelope;
use crate::tools::ToolRegistry;
use crate::types::{Result, SessionId};

#[derive(Debug, Deserialize)]
pub struct StdioRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Handle one request line. Requests without a session id are attributed to
/// `default_session`.
pub async fn handle_line(
    registry: &ToolRegistry,
    default_session: &SessionId,
    line: &str,
) -> Result<ResultEnvelope> {
    let request: StdioRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("rejecting malformed request line: {}", e);
            return Ok(ResultEnvelope::failure(format!("Invalid request: {e}")));
        }
    };

    let session = match request.session_id {
        Some(id) => match SessionId::from_string(id) {
            Ok(session) => session,
            Err(msg) => return Ok(ResultEnvelope::failure(msg)),
        },
        None => default_session.clone(),
    };

    registry
        .invoke(&session, &request.tool, request.arguments)
        .await
}

/// Serve requests from `reader` until EOF, writing one envelope per line.
/// Blank lines are skipped. Returns the number of requests handled.
pub async fn serve_lines<R, W>(
    registry: &ToolRegistry,
    default_session: &SessionId,
    reader: R,
    mut writer: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let envelope = handle_line(registry, default_session, line).await?;
        let mut out = serde_json::to_vec(&envelope)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }

    Ok(handled)
}
