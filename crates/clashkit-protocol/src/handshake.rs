//! Handshake metadata sent with every login request.

/// Fixed client/device identification included in the login packet.
///
/// The server accepts a login only when these fields match a client build
/// it knows about, so the defaults are the values of a real release and
/// should be changed only together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub major_version: i32,
    pub minor_version: i32,
    pub content_version: i32,
    /// SHA-1 of the content fingerprint shipped with the client build.
    pub fingerprint_hash: String,
    pub open_udid: String,
    pub mac_address: Option<String>,
    pub device_model: String,
    pub locale_key: i32,
    pub language: String,
    pub advertising_guid: String,
    pub os_version: String,
    pub advertising_tracking_enabled: bool,
    pub android_device_id: String,
    pub facebook_distribution_id: String,
    pub vendor_guid: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            major_version: 7,
            minor_version: 156,
            content_version: 0,
            fingerprint_hash: "6c12b527e6810ff7301d972042ae3614f3d73acc".to_string(),
            open_udid: "563a6f060d8624db".to_string(),
            mac_address: None,
            device_model: "GT-I9300".to_string(),
            locale_key: 2_000_000,
            language: "en".to_string(),
            advertising_guid: String::new(),
            os_version: "4.0.4".to_string(),
            advertising_tracking_enabled: false,
            android_device_id: "563a6f060d8624db".to_string(),
            facebook_distribution_id: String::new(),
            vendor_guid: String::new(),
        }
    }
}
