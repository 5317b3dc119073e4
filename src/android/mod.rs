// src/android/mod.rs
//!
//! Android host
//!
//! Implements [`ContentHost`] and [`PickerLauncher`] over JNI against the
//! hosting activity. Content access goes through the activity's
//! `ContentResolver`; pickers are launched through two activity methods,
//! `openFilePicker(int, long, int)` and `openDirectoryPicker(int, long, int)`,
//! which receive the request code, the pick token and the requested flags.
//! The activity reports completion through the exports in [`exports`].
//!

mod exports;
mod handles;

use std::sync::Arc;

use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JObject, JObjectArray, JString, JValue};
use jni::{JNIEnv, JavaVM};

use crate::correlator::{PickKind, PickRequest};
use crate::host::{ContentHost, ContentStream, Cursor, HostError, PickerLauncher};
use crate::identifier::ResourceIdentifier;
use crate::permissions::{Grant, GrantFlags};
use handles::{JniCursor, JniInputStream};

const LOCAL_FRAME_CAPACITY: i32 = 16;

const URI_CLASS: &str = "android/net/Uri";
const STRING_CLASS: &str = "java/lang/String";
const FILE_NOT_FOUND_EXCEPTION: &str = "java/io/FileNotFoundException";
const IO_EXCEPTION: &str = "java/io/IOException";
const SECURITY_EXCEPTION: &str = "java/lang/SecurityException";

const SIG_PARSE_URI: &str = "(Ljava/lang/String;)Landroid/net/Uri;";
const SIG_QUERY: &str = "(Landroid/net/Uri;[Ljava/lang/String;Ljava/lang/String;[Ljava/lang/String;Ljava/lang/String;)Landroid/database/Cursor;";
const SIG_URI_FLAGS: &str = "(Landroid/net/Uri;I)V";

impl From<JniError> for HostError {
    fn from(e: JniError) -> Self {
        HostError::Provider {
            reason: format!("JNI call failed: {e}"),
        }
    }
}

pub struct AndroidHost {
    vm: Arc<JavaVM>,
    activity: GlobalRef,
}

impl AndroidHost {
    pub fn new(env: &mut JNIEnv, activity: &JObject) -> Result<Self, HostError> {
        let vm = env.get_java_vm()?;
        let activity = env.new_global_ref(activity)?;

        Ok(Self {
            vm: Arc::new(vm),
            activity,
        })
    }

    pub(crate) fn vm(&self) -> Arc<JavaVM> {
        Arc::clone(&self.vm)
    }

    pub(crate) fn activity(&self) -> GlobalRef {
        self.activity.clone()
    }

    fn content_resolver<'l>(&self, env: &mut JNIEnv<'l>) -> Result<JObject<'l>, HostError> {
        let resolver = env.call_method(
            &self.activity,
            "getContentResolver",
            "()Landroid/content/ContentResolver;",
            &[],
        );
        Ok(java_call(env, "content resolver", resolver)?.l()?)
    }

    fn with_uri_flags(
        &self,
        method: &str,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError> {
        with_env(&self.vm, |env| {
            let resolver = self.content_resolver(env)?;
            let uri = parse_uri(env, identifier)?;
            let result = env.call_method(
                &resolver,
                method,
                SIG_URI_FLAGS,
                &[JValue::Object(&uri), JValue::Int(flags_to_jint(flags))],
            );
            java_call(env, identifier.as_str(), result)?.v()?;
            Ok(())
        })
    }

    /// Reads one `UriPermission` entry. Entries whose uri does not parse are skipped.
    fn read_uri_permission(env: &mut JNIEnv, permission: &JObject) -> Result<Option<Grant>, HostError> {
        let uri = env.call_method(permission, "getUri", "()Landroid/net/Uri;", &[]);
        let uri = java_call(env, "uri permission", uri)?.l()?;
        let raw = env.call_method(&uri, "toString", "()Ljava/lang/String;", &[]);
        let raw = java_call(env, "uri permission", raw)?.l()?;
        let Some(raw) = java_string(env, raw)? else {
            return Ok(None);
        };

        let readable = env.call_method(permission, "isReadPermission", "()Z", &[]);
        let readable = java_call(env, &raw, readable)?.z()?;
        let writable = env.call_method(permission, "isWritePermission", "()Z", &[]);
        let writable = java_call(env, &raw, writable)?.z()?;

        let mut flags = GrantFlags::empty();
        if readable {
            flags = flags | GrantFlags::READ;
        }
        if writable {
            flags = flags | GrantFlags::WRITE;
        }

        match ResourceIdentifier::parse(&raw) {
            Ok(identifier) => Ok(Some(Grant {
                identifier,
                flags,
                persisted: true,
            })),
            Err(e) => {
                tracing::warn!(uri = %raw, error = %e, "skipping unparsable persisted grant");
                Ok(None)
            }
        }
    }
}

impl ContentHost for AndroidHost {
    fn query(
        &self,
        identifier: &ResourceIdentifier,
        projection: &[&str],
    ) -> Result<Option<Box<dyn Cursor>>, HostError> {
        with_env(&self.vm, |env| {
            let resolver = self.content_resolver(env)?;
            let uri = parse_uri(env, identifier)?;
            let columns = string_array(env, projection)?;
            let null = JObject::null();

            let cursor = env.call_method(
                &resolver,
                "query",
                SIG_QUERY,
                &[
                    JValue::Object(&uri),
                    JValue::Object(&columns),
                    JValue::Object(&null),
                    JValue::Object(&null),
                    JValue::Object(&null),
                ],
            );
            let cursor = java_call(env, identifier.as_str(), cursor)?.l()?;
            if cursor.is_null() {
                return Ok(None);
            }

            let cursor = env.new_global_ref(cursor)?;
            Ok(Some(
                Box::new(JniCursor::new(self.vm(), cursor)) as Box<dyn Cursor>
            ))
        })
    }

    fn open_input_stream(
        &self,
        identifier: &ResourceIdentifier,
    ) -> Result<Option<ContentStream>, HostError> {
        with_env(&self.vm, |env| {
            let resolver = self.content_resolver(env)?;
            let uri = parse_uri(env, identifier)?;

            let stream = env.call_method(
                &resolver,
                "openInputStream",
                "(Landroid/net/Uri;)Ljava/io/InputStream;",
                &[JValue::Object(&uri)],
            );
            let stream = java_call(env, identifier.as_str(), stream)?.l()?;
            if stream.is_null() {
                return Ok(None);
            }

            let stream = env.new_global_ref(stream)?;
            Ok(Some(
                Box::new(JniInputStream::new(self.vm(), stream)) as ContentStream
            ))
        })
    }

    fn take_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError> {
        self.with_uri_flags("takePersistableUriPermission", identifier, flags)
    }

    fn release_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError> {
        self.with_uri_flags("releasePersistableUriPermission", identifier, flags)
    }

    fn persisted_permissions(&self) -> Result<Vec<Grant>, HostError> {
        with_env(&self.vm, |env| {
            let resolver = self.content_resolver(env)?;
            let list = env.call_method(
                &resolver,
                "getPersistedUriPermissions",
                "()Ljava/util/List;",
                &[],
            );
            let list = java_call(env, "persisted permissions", list)?.l()?;
            if list.is_null() {
                return Ok(Vec::new());
            }

            let size = env.call_method(&list, "size", "()I", &[]);
            let size = java_call(env, "persisted permissions", size)?.i()?;

            let mut grants = Vec::new();
            for i in 0..size {
                let grant = env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| {
                    let permission = env.call_method(
                        &list,
                        "get",
                        "(I)Ljava/lang/Object;",
                        &[JValue::Int(i)],
                    );
                    let permission = java_call(env, "persisted permissions", permission)?.l()?;
                    Self::read_uri_permission(env, &permission)
                })?;
                grants.extend(grant);
            }

            Ok(grants)
        })
    }
}

impl PickerLauncher for AndroidHost {
    fn launch(&self, request: &PickRequest) -> Result<(), HostError> {
        let method = match request.kind {
            PickKind::File => "openFilePicker",
            PickKind::Directory => "openDirectoryPicker",
        };

        let token = i64::try_from(request.token.value()).map_err(|_| HostError::Provider {
            reason: format!("pick token {} does not fit a jlong", request.token),
        })?;

        with_env(&self.vm, |env| {
            let result = env.call_method(
                &self.activity,
                method,
                "(IJI)V",
                &[
                    JValue::Int(request.request_code),
                    JValue::Long(token),
                    JValue::Int(flags_to_jint(request.requested)),
                ],
            );
            java_call(env, method, result)?.v()?;
            Ok(())
        })
    }
}

/// Runs `f` on an attached JNI env inside its own local reference frame.
pub(crate) fn with_env<T, F>(vm: &JavaVM, f: F) -> Result<T, HostError>
where
    F: FnOnce(&mut JNIEnv) -> Result<T, HostError>,
{
    let mut env = vm.attach_current_thread()?;
    env.with_local_frame(LOCAL_FRAME_CAPACITY, f)
}

/// Turns a pending Java exception into a [`HostError`] and clears it.
pub(crate) fn java_call<T>(
    env: &mut JNIEnv,
    context: &str,
    result: jni::errors::Result<T>,
) -> Result<T, HostError> {
    match result {
        Ok(value) => Ok(value),
        Err(JniError::JavaException) => Err(take_exception(env, context)),
        Err(e) => Err(e.into()),
    }
}

fn take_exception(env: &mut JNIEnv, context: &str) -> HostError {
    let throwable = match env.exception_occurred() {
        Ok(throwable) if !throwable.is_null() => throwable,
        _ => {
            let _ = env.exception_clear();
            return HostError::Provider {
                reason: format!("{context}: unknown Java exception"),
            };
        }
    };
    let _ = env.exception_clear();

    let reason = env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .ok()
        .and_then(|s| java_string(env, s).ok().flatten())
        .unwrap_or_else(|| "Java exception".to_string());
    let _ = env.exception_clear();

    if is_instance(env, &throwable, FILE_NOT_FOUND_EXCEPTION) {
        HostError::FileNotFound {
            identifier: context.to_string(),
        }
    } else if is_instance(env, &throwable, SECURITY_EXCEPTION) {
        HostError::Security { reason }
    } else if is_instance(env, &throwable, IO_EXCEPTION) {
        HostError::Io(std::io::Error::other(reason))
    } else {
        HostError::Provider { reason }
    }
}

fn is_instance(env: &mut JNIEnv, object: &JObject, class: &str) -> bool {
    env.is_instance_of(object, class).unwrap_or(false)
}

pub(crate) fn java_string(env: &mut JNIEnv, value: JObject) -> Result<Option<String>, JniError> {
    if value.is_null() {
        return Ok(None);
    }
    let value = JString::from(value);
    let s: String = env.get_string(&value)?.into();
    Ok(Some(s))
}

fn parse_uri<'l>(
    env: &mut JNIEnv<'l>,
    identifier: &ResourceIdentifier,
) -> Result<JObject<'l>, HostError> {
    let raw = env.new_string(identifier.as_str())?;
    let uri = env.call_static_method(URI_CLASS, "parse", SIG_PARSE_URI, &[JValue::Object(&raw)]);
    Ok(java_call(env, identifier.as_str(), uri)?.l()?)
}

pub(crate) fn string_array<'l, S: AsRef<str>>(
    env: &mut JNIEnv<'l>,
    values: &[S],
) -> Result<JObjectArray<'l>, HostError> {
    let len = i32::try_from(values.len()).map_err(|_| HostError::Provider {
        reason: "too many strings for a Java array".to_string(),
    })?;

    let array = env.new_object_array(len, STRING_CLASS, JObject::null())?;
    for (i, value) in (0..len).zip(values) {
        let value = env.new_string(value.as_ref())?;
        env.set_object_array_element(&array, i, value)?;
    }

    Ok(array)
}

/// Intent grant bits share their values with [`GrantFlags`].
fn flags_to_jint(flags: GrantFlags) -> i32 {
    i32::try_from(flags.bits()).unwrap_or(0)
}
