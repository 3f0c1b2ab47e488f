//! Recording stand-ins for the release host, source checkout, build tools and
//! minifier.

use nanode_builder::host::{Release, ReleaseAsset, ReleaseHost, ReleaseUpload};
use nanode_builder::minify::{Minifier, MinifyError};
use nanode_builder::source::{FetchError, SourceFetcher};
use nanode_builder::workspace::Workspace;
use nanode_builder::{CommandRunner, HostError, Invocation, RunError};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

/// A trimmed-down upstream `configure.py` carrying every token the plan knows.
pub const CONFIGURE_PY: &str = r#"
if options.without_npm:
    o['variables']['node_install_npm'] = 'false'
if options.without_corepack:
    o['variables']['node_install_corepack'] = 'false'
if options.without_amaro:
    o['variables']['node_use_amaro'] = 'false'
if options.without_sqlite:
    o['variables']['node_use_sqlite'] = 'false'
if options.without_inspector:
    o['variables']['v8_enable_inspector'] = 0
o['variables']['v8_enable_pointer_compression'] = b(options.v8_enable_pointer_compression)
o['variables']['v8_enable_object_print'] = 0 if options.v8_disable_object_print else 1
o['variables']['v8_enable_object_print'] = 1 if options.v8_enable_object_print else 0
o['variables']['v8_enable_i18n_support'] = b(options.v8_enable_i18n_support)
o['variables']['v8_enable_lite_mode'] = b(options.v8_lite_mode)
o['variables']['enable_lto'] = b(options.enable_lto)
o['variables']['node_with_ltcg'] = b(options.with_ltcg)
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub tag: String,
    pub release_name: String,
    pub notes: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// In-memory release host.
#[derive(Default)]
pub struct RecordingHost {
    pub existing: Option<Release>,
    pub fail_lookup: bool,
    pub fail_upload: bool,
    pub lookups: Cell<usize>,
    pub uploads: RefCell<Vec<Upload>>,
}

impl RecordingHost {
    pub fn with_assets(tag: &str, names: &[&str]) -> Self {
        Self {
            existing: Some(Release {
                id: 1,
                tag: tag.to_string(),
                assets: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ReleaseAsset {
                        id: i as u64,
                        name: name.to_string(),
                    })
                    .collect(),
            }),
            ..Self::default()
        }
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .borrow()
            .iter()
            .map(|upload| upload.file_name.clone())
            .collect()
    }
}

impl ReleaseHost for RecordingHost {
    fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, HostError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.fail_lookup {
            return Err(HostError::Status {
                method: "GET",
                url: format!("https://api.github.com/repos/o/r/releases/tags/{tag}"),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self.existing.clone())
    }

    fn create_or_update_release(&self, upload: &ReleaseUpload<'_>) -> Result<(), HostError> {
        if self.fail_upload {
            return Err(HostError::Status {
                method: "POST",
                url: "https://uploads.github.com".to_string(),
                status: 422,
                body: "rejected".to_string(),
            });
        }
        let bytes = fs::read(upload.file_path).map_err(|source| HostError::Io {
            path: upload.file_path.to_path_buf(),
            source,
        })?;
        self.uploads.borrow_mut().push(Upload {
            tag: upload.tag.to_string(),
            release_name: upload.release_name.to_string(),
            notes: upload.release_notes.to_string(),
            file_name: upload.file_name.to_string(),
            bytes,
        });
        Ok(())
    }
}

/// Writes a canned `configure.py` instead of cloning.
pub struct StubFetcher {
    pub configure: String,
    pub calls: RefCell<Vec<(String, String, PathBuf)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::with_configure(CONFIGURE_PY)
    }

    pub fn with_configure(configure: &str) -> Self {
        Self {
            configure: configure.to_string(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl SourceFetcher for StubFetcher {
    fn fetch(&self, repository: &str, tag: &str, dest: &Path) -> Result<(), FetchError> {
        self.calls
            .borrow_mut()
            .push((repository.to_string(), tag.to_string(), dest.to_path_buf()));
        fs::write(dest.join("configure.py"), &self.configure).unwrap();
        Ok(())
    }
}

/// Records invocations and leaves behind the files a real toolchain would.
///
/// When `./configure` or `vcbuild.bat` runs, the patched `configure.py` is
/// captured so tests can inspect it after the workspace is gone.
#[derive(Default)]
pub struct FakeToolchain {
    pub calls: RefCell<Vec<Invocation>>,
    pub fail_on: Option<&'static str>,
    pub configure_snapshot: RefCell<Option<String>>,
}

impl FakeToolchain {
    pub fn failing_on(program: &'static str) -> Self {
        Self {
            fail_on: Some(program),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> Result<(), RunError> {
        self.calls.borrow_mut().push(invocation.clone());
        if self.fail_on == Some(invocation.program.as_str()) {
            return Err(RunError::Failed {
                command: invocation.to_string(),
                code: Some(2),
            });
        }

        let out = invocation.cwd.join("out").join("Release");
        match invocation.program.as_str() {
            "./configure" | "cmd" => {
                let configure = fs::read_to_string(invocation.cwd.join("configure.py")).unwrap();
                *self.configure_snapshot.borrow_mut() = Some(configure);
                if invocation.program == "cmd" {
                    fs::create_dir_all(&out).unwrap();
                    fs::write(out.join("node.exe"), b"MZ").unwrap();
                    fs::write(out.join("node.pdb"), b"PDB").unwrap();
                }
            }
            "make" => {
                fs::create_dir_all(&out).unwrap();
                fs::write(out.join("node"), b"unstripped").unwrap();
            }
            "strip" => fs::write(out.join("node"), b"stripped").unwrap(),
            "upx" => {
                let target = invocation.cwd.join(invocation.args.last().unwrap());
                fs::write(target, b"compressed").unwrap();
            }
            _ => {}
        }
        Ok(())
    }
}

/// Always fails, as a minifier whose target is missing would.
pub struct FailingMinifier {
    pub called: Cell<bool>,
}

impl FailingMinifier {
    pub fn new() -> Self {
        Self {
            called: Cell::new(false),
        }
    }
}

impl Minifier for FailingMinifier {
    fn minify(&self, workspace: &Workspace) -> Result<usize, MinifyError> {
        self.called.set(true);
        Err(workspace.resolve("deps/undici/undici.js").unwrap_err().into())
    }
}
