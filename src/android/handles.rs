// src/android/handles.rs
//!
//! Owned Java cursors and input streams. Both are closed on drop.
//!

use std::io::{self, Read};
use std::sync::Arc;

use jni::objects::{GlobalRef, JValue};
use jni::JavaVM;

use super::{java_call, java_string, with_env};
use crate::host::{Cursor, HostError};

pub(super) struct JniCursor {
    vm: Arc<JavaVM>,
    cursor: GlobalRef,
}

impl JniCursor {
    pub(super) fn new(vm: Arc<JavaVM>, cursor: GlobalRef) -> Self {
        Self { vm, cursor }
    }
}

impl Cursor for JniCursor {
    fn column_index(&self, name: &str) -> Option<usize> {
        let index = with_env(&self.vm, |env| {
            let name = env.new_string(name)?;
            let index = env.call_method(
                &self.cursor,
                "getColumnIndex",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&name)],
            );
            Ok(java_call(env, "cursor", index)?.i()?)
        });

        match index {
            // -1 when the provider did not return the column
            Ok(index) => usize::try_from(index).ok(),
            Err(e) => {
                tracing::warn!(column = name, error = %e, "cursor column lookup failed");
                None
            }
        }
    }

    fn move_to_next(&mut self) -> Result<bool, HostError> {
        with_env(&self.vm, |env| {
            let moved = env.call_method(&self.cursor, "moveToNext", "()Z", &[]);
            Ok(java_call(env, "cursor", moved)?.z()?)
        })
    }

    fn get_string(&self, column: usize) -> Result<Option<String>, HostError> {
        let column = i32::try_from(column).map_err(|_| HostError::Provider {
            reason: format!("column index {column} out of range"),
        })?;

        with_env(&self.vm, |env| {
            let value = env.call_method(
                &self.cursor,
                "getString",
                "(I)Ljava/lang/String;",
                &[JValue::Int(column)],
            );
            let value = java_call(env, "cursor", value)?.l()?;
            Ok(java_string(env, value)?)
        })
    }
}

impl Drop for JniCursor {
    fn drop(&mut self) {
        close(&self.vm, &self.cursor, "cursor");
    }
}

pub(super) struct JniInputStream {
    vm: Arc<JavaVM>,
    stream: GlobalRef,
}

impl JniInputStream {
    pub(super) fn new(vm: Arc<JavaVM>, stream: GlobalRef) -> Self {
        Self { vm, stream }
    }
}

impl Read for JniInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = i32::try_from(buf.len()).unwrap_or(i32::MAX);

        let chunk = with_env(&self.vm, |env| {
            let array = env.new_byte_array(len)?;
            let count = env.call_method(
                &self.stream,
                "read",
                "([BII)I",
                &[JValue::Object(&array), JValue::Int(0), JValue::Int(len)],
            );
            let count = java_call(env, "input stream", count)?.i()?;

            // -1 at end of stream
            let Ok(count) = usize::try_from(count) else {
                return Ok(Vec::new());
            };

            let mut chunk = vec![0i8; count];
            env.get_byte_array_region(&array, 0, &mut chunk)?;
            Ok(chunk)
        })
        .map_err(|e| match e {
            HostError::Io(e) => e,
            HostError::FileNotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            other => io::Error::other(other.to_string()),
        })?;

        for (dst, src) in buf.iter_mut().zip(&chunk) {
            *dst = *src as u8;
        }
        Ok(chunk.len())
    }
}

impl Drop for JniInputStream {
    fn drop(&mut self) {
        close(&self.vm, &self.stream, "input stream");
    }
}

fn close(vm: &JavaVM, object: &GlobalRef, what: &str) {
    let closed = with_env(vm, |env| {
        let result = env.call_method(object, "close", "()V", &[]);
        java_call(env, what, result)?.v()?;
        Ok(())
    });

    if let Err(e) = closed {
        tracing::warn!(error = %e, "failed to close {what}");
    }
}
