//! BLE telemetry adapter.
//!
//! Implements [`RadioPort`] and bridges GAP/GATT callbacks into the
//! [`TelemetryService`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation link for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                     | Props        |
//! |----------------|------------------------------------------|--------------|
//! | Payload        | `9a8b7c6d-…-feedbeef1002`                | Read+Notify  |
//! | Control        | `9a8b7c6d-…-feedbeef1003`                | Write        |
//! | History        | `9a8b7c6d-…-feedbeef1004`                | Notify       |
//!
//! Every access is gated by the service on an encrypted link; the stack's
//! own attribute permissions are left open so that denials carry the
//! service's ATT codes.

#[cfg(not(target_os = "espidf"))]
use log::{debug, info};

use crate::app::link::LinkEvent;
use crate::app::ports::{Characteristic, ConnHandle, RadioPort};
use crate::app::service::TelemetryService;
use crate::app::wire::PAYLOAD_FRAME_LEN;
use crate::error::{RadioError, att};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x9a8b7c6d_5e4f_3a2b_1c0d_feedbeef1001;
pub const CHAR_PAYLOAD: u128 = 0x9a8b7c6d_5e4f_3a2b_1c0d_feedbeef1002;
pub const CHAR_CONTROL: u128 = 0x9a8b7c6d_5e4f_3a2b_1c0d_feedbeef1003;
pub const CHAR_HISTORY: u128 = 0x9a8b7c6d_5e4f_3a2b_1c0d_feedbeef1004;

/// Client Characteristic Configuration descriptor.
pub const CCCD_UUID16: u16 = 0x2902;
const CCCD_NOTIFY: u16 = 0x0001;
const CCCD_INDICATE: u16 = 0x0002;

// ───────────────────────────────────────────────────────────────
// Access dispatch (stack-independent)
// ───────────────────────────────────────────────────────────────

/// What to answer a GATT access with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessResponse {
    Value(heapless::Vec<u8, PAYLOAD_FRAME_LEN>),
    Ack,
    /// ATT error code.
    Denied(u8),
}

/// Serve a characteristic read.
pub fn dispatch_read<R: RadioPort>(
    svc: &TelemetryService<R>,
    characteristic: Characteristic,
) -> AccessResponse {
    match characteristic {
        Characteristic::Payload => match svc.read_payload() {
            Ok(frame) => AccessResponse::Value(heapless::Vec::from_slice(&frame).unwrap_or_default()),
            Err(e) => AccessResponse::Denied(e.att_code()),
        },
        Characteristic::Control | Characteristic::History => {
            AccessResponse::Denied(att::READ_NOT_PERMITTED)
        }
    }
}

/// Serve a characteristic write.
pub fn dispatch_write<R: RadioPort>(
    svc: &TelemetryService<R>,
    characteristic: Characteristic,
    data: &[u8],
) -> AccessResponse {
    match characteristic {
        Characteristic::Control => match svc.write_control(data) {
            Ok(_) => AccessResponse::Ack,
            Err(e) => AccessResponse::Denied(e.att_code()),
        },
        Characteristic::Payload | Characteristic::History => {
            AccessResponse::Denied(att::WRITE_NOT_PERMITTED)
        }
    }
}

/// Translate a CCCD write into a subscription event.
pub fn cccd_event(characteristic: Characteristic, value: &[u8]) -> Option<LinkEvent> {
    let bits: [u8; 2] = value.try_into().ok()?;
    let bits = u16::from_le_bytes(bits);
    Some(LinkEvent::Subscribe {
        characteristic,
        enabled: bits & (CCCD_NOTIFY | CCCD_INDICATE) != 0,
    })
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF static state
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the service.

#[cfg(target_os = "espidf")]
mod stack {
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};

    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::*;

    pub(super) static SERVICE: OnceLock<Arc<TelemetryService<BleRadio>>> = OnceLock::new();

    pub(super) static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    pub(super) static CONN_ID: AtomicU32 = AtomicU32::new(0);
    pub(super) static CONNECTED: AtomicBool = AtomicBool::new(false);
    pub(super) static ENCRYPTED: AtomicBool = AtomicBool::new(false);
    pub(super) static PEER_ADDR: Mutex<[u8; 6]> = Mutex::new([0; 6]);

    static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
    pub(super) static PAYLOAD_HANDLE: AtomicU32 = AtomicU32::new(0);
    static PAYLOAD_CCCD_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CONTROL_HANDLE: AtomicU32 = AtomicU32::new(0);
    pub(super) static HISTORY_HANDLE: AtomicU32 = AtomicU32::new(0);
    static HISTORY_CCCD_HANDLE: AtomicU32 = AtomicU32::new(0);
    static STEP: AtomicU32 = AtomicU32::new(0);

    /// Attribute handles: service, 3 × (decl + value), 2 × CCCD.
    const NUM_HANDLES: u16 = 9;

    fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    unsafe fn add_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
        let mut char_uuid = uuid128_to_esp(uuid);
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut char_uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            );
        }
    }

    unsafe fn add_cccd(svc_handle: u16) {
        let mut uuid: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        uuid.len = 2;
        uuid.uuid.uuid16 = CCCD_UUID16;
        unsafe {
            esp_ble_gatts_add_char_descr(
                svc_handle,
                &mut uuid,
                (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            );
        }
    }

    pub(super) unsafe fn start_advertising() {
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        unsafe {
            esp_ble_gap_start_advertising(&mut adv_params);
        }
    }

    fn dispatch(event: LinkEvent) {
        if let Some(svc) = SERVICE.get() {
            svc.on_link_event(event);
        }
    }

    fn characteristic_for(handle: u32) -> Option<Characteristic> {
        if handle == PAYLOAD_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::Payload)
        } else if handle == CONTROL_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::Control)
        } else if handle == HISTORY_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::History)
        } else {
            None
        }
    }

    fn cccd_for(handle: u32) -> Option<Characteristic> {
        if handle == PAYLOAD_CCCD_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::Payload)
        } else if handle == HISTORY_CCCD_HANDLE.load(Ordering::Relaxed) {
            Some(Characteristic::History)
        } else {
            None
        }
    }

    unsafe fn respond(gatts_if: esp_gatt_if_t, conn_id: u16, trans_id: u32, handle: u16, response: AccessResponse) {
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        let status = match &response {
            AccessResponse::Value(bytes) => {
                let value = unsafe { &mut rsp.attr_value };
                value.handle = handle;
                value.len = bytes.len() as u16;
                value.value[..bytes.len()].copy_from_slice(bytes);
                esp_gatt_status_t_ESP_GATT_OK
            }
            AccessResponse::Ack => esp_gatt_status_t_ESP_GATT_OK,
            AccessResponse::Denied(code) => *code as esp_gatt_status_t,
        };
        unsafe {
            esp_ble_gatts_send_response(gatts_if, conn_id, trans_id, status, &mut rsp);
        }
    }

    pub(super) unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                let status = unsafe { (*param).adv_start_cmpl.status };
                if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                    dispatch(LinkEvent::AdvertisingStarted);
                } else {
                    warn!("BLE GAP: advertising start failed (status={})", status);
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                dispatch(LinkEvent::AdvertisingComplete);
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => unsafe {
                esp_ble_gap_security_rsp((*param).ble_security.ble_req.bd_addr.as_mut_ptr(), true);
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
                let p = unsafe { &(*param).ble_security.auth_cmpl };
                if !p.success {
                    warn!("BLE GAP: encryption failed (reason={})", p.fail_reason);
                }
                ENCRYPTED.store(p.success, Ordering::Release);
                dispatch(LinkEvent::EncryptionChanged { success: p.success });
            }
            _ => {}
        }
    }

    pub(super) unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                GATTS_IF.store(gatts_if as u32, Ordering::Relaxed);
                info!("BLE GATTS: app registered (if={})", gatts_if);
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                unsafe {
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, NUM_HANDLES);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc_handle = unsafe { (*param).create.service_handle };
                SVC_HANDLE.store(svc_handle as u32, Ordering::Relaxed);
                STEP.store(1, Ordering::Relaxed);
                unsafe {
                    esp_ble_gatts_start_service(svc_handle);
                    add_char(
                        svc_handle,
                        CHAR_PAYLOAD,
                        ESP_GATT_PERM_READ,
                        ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let handle = unsafe { (*param).add_char.attr_handle } as u32;
                let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                match STEP.load(Ordering::Relaxed) {
                    1 => {
                        PAYLOAD_HANDLE.store(handle, Ordering::Relaxed);
                        STEP.store(2, Ordering::Relaxed);
                        unsafe { add_cccd(svc_handle) };
                    }
                    3 => {
                        CONTROL_HANDLE.store(handle, Ordering::Relaxed);
                        STEP.store(4, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                svc_handle,
                                CHAR_HISTORY,
                                0,
                                ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                            );
                        }
                    }
                    4 => {
                        HISTORY_HANDLE.store(handle, Ordering::Relaxed);
                        STEP.store(5, Ordering::Relaxed);
                        unsafe { add_cccd(svc_handle) };
                    }
                    _ => {}
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                let handle = unsafe { (*param).add_char_descr.attr_handle } as u32;
                let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                match STEP.load(Ordering::Relaxed) {
                    2 => {
                        PAYLOAD_CCCD_HANDLE.store(handle, Ordering::Relaxed);
                        STEP.store(3, Ordering::Relaxed);
                        unsafe {
                            add_char(
                                svc_handle,
                                CHAR_CONTROL,
                                ESP_GATT_PERM_WRITE,
                                ESP_GATT_CHAR_PROP_BIT_WRITE,
                            );
                        }
                    }
                    5 => {
                        HISTORY_CCCD_HANDLE.store(handle, Ordering::Relaxed);
                        STEP.store(6, Ordering::Relaxed);
                        info!("BLE GATTS: all characteristics registered");
                    }
                    _ => {}
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                CONN_ID.store(p.conn_id as u32, Ordering::Release);
                ENCRYPTED.store(false, Ordering::Release);
                CONNECTED.store(true, Ordering::Release);
                if let Ok(mut addr) = PEER_ADDR.lock() {
                    *addr = p.remote_bda;
                }
                dispatch(LinkEvent::Connected(p.conn_id));
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                CONNECTED.store(false, Ordering::Release);
                ENCRYPTED.store(false, Ordering::Release);
                dispatch(LinkEvent::Disconnected);
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = unsafe { &(*param).read };
                let Some(svc) = SERVICE.get() else { return };
                let response = match characteristic_for(p.handle as u32) {
                    Some(c) => dispatch_read(svc, c),
                    None => AccessResponse::Denied(att::READ_NOT_PERMITTED),
                };
                unsafe { respond(gatts_if, p.conn_id, p.trans_id, p.handle, response) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                let Some(svc) = SERVICE.get() else { return };
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                let handle = p.handle as u32;

                let response = if let Some(c) = cccd_for(handle) {
                    match cccd_event(c, data) {
                        Some(event) => {
                            svc.on_link_event(event);
                            AccessResponse::Ack
                        }
                        None => AccessResponse::Denied(att::INVALID_ATTR_VALUE_LEN),
                    }
                } else if let Some(c) = characteristic_for(handle) {
                    dispatch_write(svc, c, data)
                } else {
                    AccessResponse::Denied(att::WRITE_NOT_PERMITTED)
                };
                if p.need_rsp {
                    unsafe { respond(gatts_if, p.conn_id, p.trans_id, p.handle, response) };
                }
            }
            _ => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

/// Radio port backed by the BLE stack (or a simulated link on the host).
pub struct BleRadio {
    device_name: heapless::String<24>,
    #[cfg(not(target_os = "espidf"))]
    sim: sim::SimLink,
}

impl BleRadio {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            device_name,
            #[cfg(not(target_os = "espidf"))]
            sim: sim::SimLink::default(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Bring up the stack and route its callbacks into `service`.
#[cfg(target_os = "espidf")]
pub fn start(service: std::sync::Arc<TelemetryService<BleRadio>>) -> Result<(), RadioError> {
    use esp_idf_svc::sys::*;

    let name = service.radio().device_name.clone();
    if stack::SERVICE.set(service).is_err() {
        return Err(RadioError::Stack(ESP_ERR_INVALID_STATE as i32));
    }

    let check = |ret: esp_err_t, what: &str| -> Result<(), RadioError> {
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            log::error!("BLE: {} failed ({})", what, ret);
            Err(RadioError::Stack(ret))
        }
    };

    unsafe {
        esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);
        let mut bt_cfg = esp_bt_controller_config_t::default();
        check(esp_bt_controller_init(&mut bt_cfg), "bt_controller_init")?;
        check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE), "bt_controller_enable")?;
        check(esp_bluedroid_init(), "bluedroid_init")?;
        check(esp_bluedroid_enable(), "bluedroid_enable")?;

        check(esp_ble_gap_register_callback(Some(stack::gap_event_handler)), "gap_register")?;
        check(esp_ble_gatts_register_callback(Some(stack::gatts_event_handler)), "gatts_register")?;
        check(esp_ble_gatts_app_register(0), "gatts_app_register")?;

        // Just-works pairing with bonding; encryption is what gates access.
        let auth_req = esp_ble_auth_req_t_ESP_LE_AUTH_REQ_SC_BOND;
        let iocap = esp_ble_io_cap_t_ESP_IO_CAP_NONE;
        let key_size: u8 = 16;
        let keys: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
        esp_ble_gap_set_security_param(
            esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE,
            &auth_req as *const _ as *mut _,
            core::mem::size_of_val(&auth_req) as u32,
        );
        esp_ble_gap_set_security_param(
            esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE,
            &iocap as *const _ as *mut _,
            core::mem::size_of_val(&iocap) as u32,
        );
        esp_ble_gap_set_security_param(
            esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE,
            &key_size as *const _ as *mut _,
            1,
        );
        esp_ble_gap_set_security_param(
            esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY,
            &keys as *const _ as *mut _,
            1,
        );
        esp_ble_gap_set_security_param(
            esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY,
            &keys as *const _ as *mut _,
            1,
        );

        let mut cname = heapless::Vec::<u8, 25>::new();
        let _ = cname.extend_from_slice(name.as_bytes());
        let _ = cname.push(0);
        esp_ble_gap_set_device_name(cname.as_ptr() as *const _);
        stack::start_advertising();
    }

    log::info!("BLE(espidf): Bluedroid up, advertising as '{}'", name);
    Ok(())
}

#[cfg(target_os = "espidf")]
impl RadioPort for BleRadio {
    fn notify(&self, conn: ConnHandle, characteristic: Characteristic, data: &[u8]) -> Result<(), RadioError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        let handle = match characteristic {
            Characteristic::Payload => stack::PAYLOAD_HANDLE.load(Ordering::Relaxed),
            Characteristic::History => stack::HISTORY_HANDLE.load(Ordering::Relaxed),
            Characteristic::Control => 0,
        };
        if handle == 0 {
            return Err(RadioError::NotRegistered);
        }
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                stack::GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t,
                conn,
                handle as u16,
                data.len() as u16,
                data.as_ptr() as *mut u8,
                false,
            )
        };
        match ret {
            r if r == ESP_OK as i32 => Ok(()),
            r if r == ESP_ERR_NO_MEM as i32 => Err(RadioError::OutOfBuffers),
            r => Err(RadioError::Stack(r)),
        }
    }

    fn start_advertising(&self) {
        unsafe { stack::start_advertising() };
    }

    fn initiate_security(&self, _conn: ConnHandle) {
        use esp_idf_svc::sys::*;
        let Ok(mut addr) = stack::PEER_ADDR.lock() else {
            return;
        };
        unsafe {
            esp_ble_set_encryption(addr.as_mut_ptr(), esp_ble_sec_act_t_ESP_BLE_SEC_ENCRYPT);
        }
    }

    fn link_encrypted(&self, conn: ConnHandle) -> Option<bool> {
        use core::sync::atomic::Ordering;
        let known = stack::CONNECTED.load(Ordering::Acquire)
            && stack::CONN_ID.load(Ordering::Acquire) == u32::from(conn);
        known.then(|| stack::ENCRYPTED.load(Ordering::Acquire))
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Mutex, PoisonError};

    use crate::app::ports::{Characteristic, ConnHandle};

    const PRESENT: u32 = 1 << 16;
    const ENCRYPTED: u32 = 1 << 17;

    /// A single simulated peer: handle, presence and encryption in one word.
    #[derive(Default)]
    pub(super) struct SimLink {
        pub(super) link: AtomicU32,
        pub(super) adverts: AtomicU32,
        pub(super) sent: Mutex<Vec<(Characteristic, Vec<u8>)>>,
    }

    impl SimLink {
        pub(super) fn set(&self, conn: Option<ConnHandle>, encrypted: bool) {
            let word = match conn {
                Some(h) => PRESENT | u32::from(h) | if encrypted { ENCRYPTED } else { 0 },
                None => 0,
            };
            self.link.store(word, Ordering::Release);
        }

        pub(super) fn get(&self, conn: ConnHandle) -> Option<bool> {
            let word = self.link.load(Ordering::Acquire);
            (word & PRESENT != 0 && (word & 0xFFFF) as ConnHandle == conn)
                .then_some(word & ENCRYPTED != 0)
        }

        pub(super) fn sent(&self) -> std::sync::MutexGuard<'_, Vec<(Characteristic, Vec<u8>)>> {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl BleRadio {
    /// Simulate a central connecting (unencrypted).
    pub fn sim_connect(&self, conn: ConnHandle) {
        self.sim.set(Some(conn), false);
    }

    /// Simulate pairing completing on the current link.
    pub fn sim_encrypt(&self, conn: ConnHandle) {
        self.sim.set(Some(conn), true);
    }

    pub fn sim_disconnect(&self) {
        self.sim.set(None, false);
    }

    pub fn sim_advert_count(&self) -> u32 {
        self.sim.adverts.load(core::sync::atomic::Ordering::Relaxed)
    }

    /// Drain notifications handed to the simulated stack.
    pub fn sim_take_notifications(&self) -> Vec<(Characteristic, Vec<u8>)> {
        core::mem::take(&mut *self.sim.sent())
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for BleRadio {
    fn notify(&self, conn: ConnHandle, characteristic: Characteristic, data: &[u8]) -> Result<(), RadioError> {
        if self.sim.get(conn).is_none() {
            return Err(RadioError::Stack(-1));
        }
        debug!("BLE(sim): notify {:?} ({} bytes)", characteristic, data.len());
        self.sim.sent().push((characteristic, data.to_vec()));
        Ok(())
    }

    fn start_advertising(&self) {
        self.sim.adverts.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
    }

    fn initiate_security(&self, conn: ConnHandle) {
        debug!("BLE(sim): security requested on conn {}", conn);
    }

    fn link_encrypted(&self, conn: ConnHandle) -> Option<bool> {
        self.sim.get(conn)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
