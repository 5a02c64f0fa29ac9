//! Background-removal collaborators
//!
//! The removal model itself is an external tool. [`CommandRemover`] runs it
//! as a subprocess per image; anything else implementing
//! [`BackgroundRemover`] can stand in for it.

use crate::error::{Result, TouchupError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Program invoked by [`CommandRemover::default`]
pub const DEFAULT_REMOVER_PROGRAM: &str = "rembg";

/// Placeholder replaced by the input path in command arguments
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by the output path in command arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Removes the background of one image, writing the result to `output`
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Process `input` and write the cut-out image to `output`
    ///
    /// The output's parent directory already exists when this is called.
    async fn remove_background(&self, input: &Path, output: &Path) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Runs an external program once per image
///
/// Arguments are templates: `{input}` and `{output}` are replaced by the
/// respective paths. The default is `rembg i {input} {output}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
}

impl Default for CommandRemover {
    fn default() -> Self {
        Self::new(DEFAULT_REMOVER_PROGRAM).with_args(["i", INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER])
    }
}

impl CommandRemover {
    /// Create a remover for `program`, passing input and output as the only arguments
    #[must_use]
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: vec![INPUT_PLACEHOLDER.to_string(), OUTPUT_PLACEHOLDER.to_string()],
        }
    }

    /// Replace the argument templates
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the placeholders substituted
    #[must_use]
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                INPUT_PLACEHOLDER => input.as_os_str().to_os_string(),
                OUTPUT_PLACEHOLDER => output.as_os_str().to_os_string(),
                other => OsString::from(
                    other
                        .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
                        .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy()),
                ),
            })
            .collect()
    }
}

#[async_trait]
impl BackgroundRemover for CommandRemover {
    async fn remove_background(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.is_file() {
            return Err(TouchupError::file_io_error(
                "read input image",
                input,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let args = self.arguments(input, output);
        log::debug!("Running {} {:?}", self.program, args);

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TouchupError::processing_stage_error(
                    "background removal",
                    &format!("failed to start {}: {}", self.program, e),
                    Some(&format!("input: {}", input.display())),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TouchupError::processing_stage_error(
                "background removal",
                &format!("{} exited with {}: {}", self.program, result.status, stderr.trim()),
                Some(&format!("input: {}", input.display())),
            ));
        }

        if !output.is_file() {
            return Err(TouchupError::processing_stage_error(
                "background removal",
                &format!("{} produced no output", self.program),
                Some(&format!("expected: {}", output.display())),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
