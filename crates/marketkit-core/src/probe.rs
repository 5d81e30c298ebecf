//! The probe module: a minimal Tolk program rewritten twice per target.
//!
//! First it only imports the target's deploy function so the compiler emits
//! a listing containing it. Then the extracted asm is embedded inline and
//! exposed through a getter, so the recompiled probe returns the function as
//! a cell.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::listing::ExtractedFunction;

/// Handle to the probe module source file.
#[derive(Debug, Clone)]
pub struct ProbeModule {
    path: PathBuf,
}

impl ProbeModule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the probe at a contract's deploy function.
    pub fn bind_path(&self, contract_path: &str) -> Result<()> {
        self.write(&path_source(contract_path))
    }

    /// Embed extracted code behind the `accessor` getter.
    pub fn bind_code(&self, code: &ExtractedFunction, accessor: &str) -> Result<()> {
        self.write(&code_source(&code.text(), accessor))
    }

    fn write(&self, source: &str) -> Result<()> {
        fs::write(&self.path, source).map_err(|e| Error::write(&self.path, e))
    }
}

fn path_source(contract_path: &str) -> String {
    format!(
        "import \"{}/deploy_function.tolk\";\n\nfun onInternalMessage(): void {{\n}}",
        contract_path
    )
}

fn code_source(asm: &str, accessor: &str) -> String {
    format!(
        r#"
fun deployFunctionCell(): cell
    asm """<{{
    {asm}
}}>c PUSHREF""";


fun onInternalMessage(): void {{
}}

get fun {accessor}(): cell {{
    return deployFunctionCell();
}}"#
    )
}
