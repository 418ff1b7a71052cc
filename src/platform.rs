use std::fmt;

/// Version reported to the issuing endpoint.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Platform tag sent with token requests, fixed at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Windows,
    MacOs,
    WebGl,
    Unknown,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_arch = "wasm32") {
            Platform::WebGl
        } else {
            Platform::Unknown
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::WebGl => "webgl",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
