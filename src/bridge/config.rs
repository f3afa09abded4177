use std::env;
use std::path::PathBuf;

pub const JAVA_PATH_ENV: &str = "JAVA_PATH";
pub const DEX_EDITOR_JAR_ENV: &str = "DEX_EDITOR_JAR";
pub const JADX_PATH_ENV: &str = "JADX_PATH";

const DEFAULT_JAVA: &str = "java";
const DEFAULT_JAR: &str = "libs/dex-editor.jar";

/// How to launch the worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Executable to run
    pub program: String,
    /// Fixed launch arguments
    pub args: Vec<String>,
    /// jadx launcher handed to the worker when a package is opened
    pub jadx_path: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        BridgeConfig {
            program: program.into(),
            args,
            jadx_path: None,
        }
    }

    /// `java -jar <dex-editor.jar>` for the given jar
    pub fn java_jar<S: Into<String>>(java: S, jar: PathBuf) -> Self {
        BridgeConfig::new(java, vec!["-jar".to_string(), jar.to_string_lossy().into_owned()])
    }

    /// Reads `JAVA_PATH`, `DEX_EDITOR_JAR` and `JADX_PATH`
    ///
    /// # Examples
    ///
    /// ```no_run
    ///  use smali_bridge::bridge::BridgeConfig;
    ///
    ///  let config = BridgeConfig::from_env();
    ///  assert_eq!(config.args[0], "-jar");
    /// ```
    pub fn from_env() -> Self {
        let java = env::var(JAVA_PATH_ENV).unwrap_or_else(|_| DEFAULT_JAVA.to_string());
        let jar = env::var_os(DEX_EDITOR_JAR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JAR));
        let mut config = BridgeConfig::java_jar(java, jar);
        config.jadx_path = env::var_os(JADX_PATH_ENV).map(PathBuf::from);
        config
    }

    pub fn with_jadx_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.jadx_path = Some(path.into());
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig::java_jar(DEFAULT_JAVA, PathBuf::from(DEFAULT_JAR))
    }
}
