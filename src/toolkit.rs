//! PDF toolkit: form filling and concatenation.
//!
//! Both operations are delegated to an external utility. [`PdfToolkit`] is
//! the seam the pipeline calls through; [`Pdftk`] is the default
//! implementation and drives the `pdftk` binary. A pre-built toolkit can be
//! injected with [`crate::config::FactoryConfigBuilder::toolkit`], which is
//! how tests run whole jobs without pdftk installed.

use crate::config::FactoryConfig;
use crate::error::ToolError;
use crate::job::FieldData;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// External form filler and concatenator.
#[async_trait]
pub trait PdfToolkit: Send + Sync {
    /// Fill the form fields of `source` with `data`, writing the result to `dest`.
    async fn fill_form(&self, source: &Path, data: &FieldData, dest: &Path)
        -> Result<(), ToolError>;

    /// Concatenate `sources`, in order, into `dest`.
    async fn concat(&self, sources: &[PathBuf], dest: &Path) -> Result<(), ToolError>;
}

/// The toolkit a job should use: the injected one, or pdftk.
pub fn toolkit_for(config: &FactoryConfig) -> Arc<dyn PdfToolkit> {
    match config.toolkit {
        Some(ref toolkit) => Arc::clone(toolkit),
        None => Arc::new(Pdftk::new(&config.pdftk_path).flatten(config.flatten_forms)),
    }
}

/// [`PdfToolkit`] backed by the `pdftk` command-line tool.
#[derive(Debug, Clone)]
pub struct Pdftk {
    program: PathBuf,
    flatten: bool,
}

impl Pdftk {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            flatten: true,
        }
    }

    /// Flatten filled forms so the values can no longer be edited. Default: true.
    pub fn flatten(mut self, v: bool) -> Self {
        self.flatten = v;
        self
    }

    fn fill_form_args(&self, source: &Path, xfdf: &Path, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            source.into(),
            "fill_form".into(),
            xfdf.into(),
            "output".into(),
            dest.into(),
        ];
        if self.flatten {
            args.push("flatten".into());
        }
        args
    }

    fn concat_args(sources: &[PathBuf], dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = sources.iter().map(|p| p.as_os_str().to_owned()).collect();
        args.push("cat".into());
        args.push("output".into());
        args.push(dest.into());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), ToolError> {
        let program = self.program.display().to_string();
        debug!("Running {} {:?}", program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolError::Exit {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl PdfToolkit for Pdftk {
    async fn fill_form(
        &self,
        source: &Path,
        data: &FieldData,
        dest: &Path,
    ) -> Result<(), ToolError> {
        let xfdf = dest.with_extension("xfdf");
        tokio::fs::write(&xfdf, to_xfdf(data)).await?;
        let result = self.run(self.fill_form_args(source, &xfdf, dest)).await;
        let _ = tokio::fs::remove_file(&xfdf).await;
        result
    }

    async fn concat(&self, sources: &[PathBuf], dest: &Path) -> Result<(), ToolError> {
        if sources.is_empty() {
            return Err(ToolError::Other("nothing to concatenate".into()));
        }
        self.run(Self::concat_args(sources, dest)).await
    }
}

/// Serialise field data as an XFDF document, in field-name order.
pub fn to_xfdf(data: &FieldData) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xfdf xmlns=\"http://ns.adobe.com/xfdf/\" xml:space=\"preserve\">\n\
         <fields>\n",
    );
    for (name, value) in data {
        xml.push_str(&format!(
            "<field name=\"{}\"><value>{}</value></field>\n",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    xml.push_str("</fields>\n</xfdf>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
