use serde_json::Value;

use super::builder::ScriptBuilder;
use super::chat::LogListener;
use super::result_channel::ResultChannel;
use crate::error::EngineError;
use crate::host::HostApplication;

/// Run a built program through the host and return its result slot.
///
/// When the context names a chat host, a [`LogListener`] is bound first and
/// its port injected before serialization. The listener is closed whatever
/// the outcome.
pub async fn execute(
    mut builder: ScriptBuilder,
    host: &dyn HostApplication,
) -> Result<Value, EngineError> {
    let mut listener = match builder.context().host.clone() {
        Some(chat_host) => {
            let listener = LogListener::bind(&chat_host).await?;
            builder.context_mut().port = Some(listener.port());
            Some(listener)
        }
        None => None,
    };

    let channel = ResultChannel::new(builder.context());
    let outcome = run(&builder, &channel, host).await;

    if let Some(listener) = listener.as_mut() {
        listener.close();
    }

    let log = channel.read_log().await;
    if !log.trim().is_empty() {
        tracing::debug!(target: "aeflow::host", log = %log.trim_end(), "Script log");
    }

    outcome?;
    channel.read_result().await
}

async fn run(
    builder: &ScriptBuilder,
    channel: &ResultChannel,
    host: &dyn HostApplication,
) -> Result<(), EngineError> {
    channel.prepare(&builder.serialize()).await?;
    host.run_interactive_script(channel.script_path()).await
}
