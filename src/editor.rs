use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::bridge::{BridgeConfig, BridgeError, DexRequest, ProcessBridge, Response, DEFAULT_PAGE_LIMIT};

/// An editing session backed by one dex-editor worker.
///
/// Every call takes the session lock for the whole exchange, so callers on several threads
/// are served one at a time. Worker side state (such as the opened package) is lost if the
/// worker dies; after a transport error call [`DexEditor::open`] again. Once
/// [`DexEditor::close`] has run, every call returns [`BridgeError::Closed`].
///
/// # Examples
///
/// ```no_run
///  use smali_bridge::editor::DexEditor;
///  use smali_bridge::bridge::BridgeConfig;
///
///  let editor = DexEditor::new(BridgeConfig::from_env());
///  let opened = editor.open("app.apk").expect("worker failed");
///  if opened.success {
///      let class = editor.get_class("Lcom/example/MainActivity;").expect("worker failed");
///      println!("{:?}", class.data);
///  }
///  editor.close();
/// ```
pub struct DexEditor {
    bridge: Mutex<Option<ProcessBridge>>,
}

impl DexEditor {
    pub fn new(config: BridgeConfig) -> Self {
        DexEditor {
            bridge: Mutex::new(Some(ProcessBridge::new(config))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProcessBridge>> {
        self.bridge.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Runs one request through the worker
    pub fn request(&self, request: DexRequest) -> Result<Response, BridgeError> {
        let mut guard = self.lock();
        let bridge = guard.as_mut().ok_or(BridgeError::Closed)?;
        bridge.send(&request.to_command())
    }

    /// Loads a package into the worker. If a jadx path is configured it is handed over first.
    pub fn open(&self, apk_path: &str) -> Result<Response, BridgeError> {
        let mut guard = self.lock();
        let bridge = guard.as_mut().ok_or(BridgeError::Closed)?;
        if let Some(jadx) = bridge.config().jadx_path.clone() {
            let jadx = jadx.to_string_lossy().into_owned();
            match bridge.send(&DexRequest::SetJadx { path: &jadx }.to_command()) {
                Ok(r) if !r.success => warn!("set_jadx rejected: {}", r.error.unwrap_or_default()),
                Err(e) => warn!("set_jadx failed: {e}"),
                Ok(_) => {}
            }
        }
        bridge.send(&DexRequest::Open { apk_path }.to_command())
    }

    pub fn list_classes(&self, dex_name: Option<&str>) -> Result<Response, BridgeError> {
        self.request(DexRequest::ListClasses { dex_name })
    }

    pub fn get_class(&self, class_name: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::GetClass { class_name })
    }

    pub fn get_method(&self, class_name: &str, method_name: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::GetMethod { class_name, method_name })
    }

    pub fn modify_class(&self, class_name: &str, smali: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::ModifyClass { class_name, smali })
    }

    pub fn save(&self, output_path: Option<&str>) -> Result<Response, BridgeError> {
        self.request(DexRequest::Save { output_path })
    }

    pub fn search_class(&self, pattern: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::SearchClass { pattern })
    }

    pub fn search_string(&self, text: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::SearchString { text })
    }

    /// Method list, field list and code size of a class
    pub fn summary(&self, class_name: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::Summary { class_name })
    }

    /// Reads the class smali in pages, `offset` defaults to 0 and `limit` to [`DEFAULT_PAGE_LIMIT`]
    pub fn get_paged(
        &self,
        class_name: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Response, BridgeError> {
        self.request(DexRequest::GetPaged {
            class_name,
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        })
    }

    pub fn to_java(&self, class_name: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::ToJava { class_name })
    }

    pub fn deobfuscate(&self, class_name: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::Deobfuscate { class_name })
    }

    pub fn batch_decompile(&self, package_pattern: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::BatchDecompile { package_pattern })
    }

    pub fn set_jadx(&self, path: &str) -> Result<Response, BridgeError> {
        self.request(DexRequest::SetJadx { path })
    }

    /// Shuts the worker down and ends the session
    pub fn close(&self) {
        if let Some(mut bridge) = self.lock().take() {
            bridge.close();
        }
    }
}
