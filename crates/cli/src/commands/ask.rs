use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tanya_agent::AgentRuntime;
use tanya_core::config::{AppConfig, LoadOptions};
use tanya_core::domain::request::IncomingRequest;

use super::CommandResult;

#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub message: String,
    pub image: Option<PathBuf>,
    pub tenant: Option<String>,
    pub credential: Option<String>,
    pub conversation_id: Option<String>,
}

/// Runs one turn against the configured backends and prints the turn envelope.
pub fn run(args: AskArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2);
        }
    };

    let request = match build_request(args) {
        Ok(request) => request,
        Err(error) => return CommandResult::failure("ask", "invalid_input", format!("{error:#}"), 2),
    };

    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("ask", "runtime_init", error.to_string(), 3);
        }
    };

    let async_runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("ask", "runtime_init", error.to_string(), 3);
        }
    };

    let response = async_runtime.block_on(runtime.handle_turn(request));
    CommandResult::turn("ask", &response)
}

fn build_request(args: AskArgs) -> Result<IncomingRequest> {
    let image = args.image.as_deref().map(read_image_as_data_uri).transpose()?;
    Ok(IncomingRequest {
        message: args.message,
        image,
        credential: args.credential,
        tenant: args.tenant,
        conversation_id: args.conversation_id,
    })
}

pub fn read_image_as_data_uri(path: &Path) -> Result<String> {
    let mime = match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => bail!("unsupported image type `{}` (expected png, jpg, gif or webp)", path.display()),
    };

    let bytes =
        fs::read(path).with_context(|| format!("failed to read image `{}`", path.display()))?;
    if bytes.is_empty() {
        bail!("image `{}` is empty", path.display());
    }

    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
