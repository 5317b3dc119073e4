// src/android/exports.rs
//!
//! JNI entry points of `com.safbridge.NativeBridge`
//!
//! `nativeInit` builds a bridge for the calling activity and hands Java an
//! opaque handle; every other entry point takes that handle back. Bridge
//! errors are thrown as Java exceptions carrying the serialized error.
//! Pick results are delivered to the activity's
//! `onFilePicked(long token, String uri)` and
//! `onDirectoryPicked(long token, String uri)`, with `uri == null` when
//! nothing was selected. `nativeDestroy` answers every picker still open
//! that way before the bridge goes away.
//!

use std::ptr;
use std::sync::Arc;

use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JString, JValue};
use jni::sys::{jboolean, jbyteArray, jint, jlong, jstring, JNI_FALSE};
use jni::{JNIEnv, JavaVM};

use super::{java_call, with_env, AndroidHost};
use crate::bridge::{HostEvents, PickCallbacks, PickResult, StorageBridge};
use crate::config::BridgeConfig;
use crate::correlator::{PickKind, PickOutcome, PickToken};
use crate::error::{StorageError, StorageErrorCode};
use crate::identifier::ResourceIdentifier;
use crate::permissions::GrantFlags;

const ILLEGAL_ARGUMENT_EXCEPTION: &str = "java/lang/IllegalArgumentException";
const ILLEGAL_STATE_EXCEPTION: &str = "java/lang/IllegalStateException";
const FILE_NOT_FOUND_EXCEPTION: &str = "java/io/FileNotFoundException";
const IO_EXCEPTION: &str = "java/io/IOException";

/// Reborrows the bridge behind a handle returned by `nativeInit`.
///
/// # Safety
/// `handle` must be zero or a live handle from `nativeInit` that has not been
/// passed to `nativeDestroy`.
unsafe fn bridge<'a>(handle: jlong) -> Option<&'a StorageBridge> {
    (handle as *const StorageBridge).as_ref()
}

fn throw(env: &mut JNIEnv, error: &StorageError) {
    let class = match error.code() {
        StorageErrorCode::InvalidArgument | StorageErrorCode::Config => {
            ILLEGAL_ARGUMENT_EXCEPTION
        }
        StorageErrorCode::NotFound => FILE_NOT_FOUND_EXCEPTION,
        StorageErrorCode::Io | StorageErrorCode::ProviderQuery | StorageErrorCode::TooLarge => {
            IO_EXCEPTION
        }
        StorageErrorCode::NotInitialized
        | StorageErrorCode::AlreadyInitialized
        | StorageErrorCode::PickerUnavailable => ILLEGAL_STATE_EXCEPTION,
    };

    let message = serde_json::to_string(error).unwrap_or_else(|_| error.to_string());
    if let Err(e) = env.throw_new(class, message) {
        tracing::error!(error = %e, "failed to throw {class}");
    }
}

fn released_handle(env: &mut JNIEnv) {
    let _ = env.throw_new(ILLEGAL_STATE_EXCEPTION, "storage bridge handle is not valid");
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Result<Option<String>, StorageError> {
    if value.is_null() {
        return Ok(None);
    }
    env.get_string(value)
        .map(|s| Some(s.into()))
        .map_err(|e| StorageError::invalid_argument(format!("unreadable Java string: {e}")))
}

fn required_string(env: &mut JNIEnv, value: &JString) -> Result<String, StorageError> {
    read_string(env, value)?.ok_or_else(|| StorageError::invalid_argument("null identifier"))
}

/// Allocates a Java string for a value produced for `identifier`.
fn new_java_string<'l>(
    env: &mut JNIEnv<'l>,
    identifier: &str,
    value: String,
) -> Result<JString<'l>, StorageError> {
    env.new_string(value).map_err(|e| StorageError::Io {
        identifier: identifier.to_string(),
        reason: format!("failed to allocate Java string: {e}"),
    })
}

/// Callbacks forwarding every result to the activity on the delivering thread.
fn activity_callbacks(vm: Arc<JavaVM>, activity: GlobalRef) -> PickCallbacks {
    let deliver = move |result: PickResult| {
        let method = match result.kind {
            PickKind::File => "onFilePicked",
            PickKind::Directory => "onDirectoryPicked",
        };
        let token = i64::try_from(result.token.value()).unwrap_or(i64::MAX);

        let delivered = with_env(&vm, |env| {
            let uri = match &result.identifier {
                Some(identifier) => JObject::from(env.new_string(identifier.as_str())?),
                None => JObject::null(),
            };
            let call = env.call_method(
                &activity,
                method,
                "(JLjava/lang/String;)V",
                &[JValue::Long(token), JValue::Object(&uri)],
            );
            java_call(env, method, call)?.v()?;
            Ok(())
        });

        if let Err(e) = delivered {
            tracing::error!(token = %result.token, error = %e, "failed to deliver pick result to {method}");
        }
    };

    let on_directory = deliver.clone();
    PickCallbacks::new(deliver, on_directory)
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    activity: JObject,
    config_json: JString,
) -> jlong {
    let created = (|| -> Result<StorageBridge, StorageError> {
        let config = match read_string(&mut env, &config_json)? {
            Some(json) => BridgeConfig::from_json_str(&json)?,
            None => BridgeConfig::default(),
        };
        crate::init_tracing(&config.log_filter);

        let host = AndroidHost::new(&mut env, &activity).map_err(|e| {
            StorageError::PickerUnavailable {
                reason: e.to_string(),
            }
        })?;
        let callbacks = activity_callbacks(host.vm(), host.activity());

        let host = Arc::new(host);
        let bridge = StorageBridge::new(host.clone(), host, config)?;
        bridge.init(callbacks)?;
        Ok(bridge)
    })();

    match created {
        Ok(bridge) => Box::into_raw(Box::new(bridge)) as jlong,
        Err(e) => {
            tracing::error!(error = %e, "failed to create storage bridge");
            throw(&mut env, &e);
            0
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: Java drops its handle after this call and never reuses it.
        let bridge = unsafe { Box::from_raw(handle as *mut StorageBridge) };
        // Pickers still open are answered with no selection before teardown
        drop(bridge);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeOnResume(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `bridge`.
    match unsafe { bridge(handle) } {
        Some(bridge) => bridge.on_resume(),
        None => released_handle(&mut env),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeBeginPick(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    directory: jboolean,
) -> jlong {
    // SAFETY: see `bridge`.
    let Some(bridge) = (unsafe { bridge(handle) }) else {
        released_handle(&mut env);
        return 0;
    };

    let kind = if directory == JNI_FALSE {
        PickKind::File
    } else {
        PickKind::Directory
    };

    match bridge.begin_pick(kind) {
        Ok(token) => i64::try_from(token.value()).unwrap_or(i64::MAX),
        Err(e) => {
            throw(&mut env, &e);
            0
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeOnPickResult(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    token: jlong,
    uri: JString,
    granted_flags: jint,
) {
    // SAFETY: see `bridge`.
    let Some(bridge) = (unsafe { bridge(handle) }) else {
        released_handle(&mut env);
        return;
    };
    let Ok(token) = u64::try_from(token).map(PickToken::new) else {
        tracing::warn!(token, "ignoring pick result with a negative token");
        return;
    };

    let outcome = match read_string(&mut env, &uri) {
        Ok(None) => PickOutcome::Cancelled,
        Ok(Some(raw)) => match ResourceIdentifier::parse(&raw) {
            Ok(identifier) => PickOutcome::Selected {
                identifier,
                granted: GrantFlags::from_bits_truncate(u32::try_from(granted_flags).unwrap_or(0)),
            },
            Err(e) => {
                tracing::warn!(uri = %raw, error = %e, "picker returned an unparsable uri");
                PickOutcome::Cancelled
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "unreadable picker uri");
            PickOutcome::Cancelled
        }
    };

    bridge.on_pick_result(token, outcome);
}

/// Returns the qualifying children as a JSON array of
/// `{"identifier", "displayName", "mimeType"?}` objects.
#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeListChildren(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    tree: JString,
    extensions: JObjectArray,
) -> jstring {
    // SAFETY: see `bridge`.
    let Some(bridge) = (unsafe { bridge(handle) }) else {
        released_handle(&mut env);
        return ptr::null_mut();
    };

    let listed = (|| -> Result<JString, StorageError> {
        let tree = required_string(&mut env, &tree)?;

        let mut filter = Vec::new();
        if !extensions.is_null() {
            let len = env
                .get_array_length(&extensions)
                .map_err(|e| StorageError::invalid_argument(e.to_string()))?;
            for i in 0..len {
                let element = env
                    .get_object_array_element(&extensions, i)
                    .map_err(|e| StorageError::invalid_argument(e.to_string()))?;
                if let Some(ext) = read_string(&mut env, &JString::from(element))? {
                    filter.push(ext);
                }
            }
        }

        let json = bridge.list_children_json(&tree, &filter)?;
        new_java_string(&mut env, &tree, json)
    })();

    match listed {
        Ok(json) => json.into_raw(),
        Err(e) => {
            throw(&mut env, &e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeReadAll(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    uri: JString,
) -> jbyteArray {
    // SAFETY: see `bridge`.
    let Some(bridge) = (unsafe { bridge(handle) }) else {
        released_handle(&mut env);
        return ptr::null_mut();
    };

    let read = required_string(&mut env, &uri).and_then(|uri| {
        let bytes = bridge.read_all(&uri)?;
        env.byte_array_from_slice(&bytes)
            .map_err(|e| StorageError::Io {
                identifier: uri,
                reason: e.to_string(),
            })
    });

    match read {
        Ok(array) => array.into_raw(),
        Err(e) => {
            throw(&mut env, &e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_safbridge_NativeBridge_nativeDisplayName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    uri: JString,
) -> jstring {
    // SAFETY: see `bridge`.
    let Some(bridge) = (unsafe { bridge(handle) }) else {
        released_handle(&mut env);
        return ptr::null_mut();
    };

    let name = required_string(&mut env, &uri)
        .and_then(|uri| Ok(bridge.display_name(&uri)?.map(|name| (uri, name))));

    match name {
        Ok(Some((uri, name))) => match new_java_string(&mut env, &uri, name) {
            Ok(name) => name.into_raw(),
            Err(e) => {
                throw(&mut env, &e);
                ptr::null_mut()
            }
        },
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            throw(&mut env, &e);
            ptr::null_mut()
        }
    }
}
