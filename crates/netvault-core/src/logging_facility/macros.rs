//! Canonical logging macros
//!
//! Callers must depend on `netvault-core-types` for the schema constants.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use netvault_core::log_op_start;
/// log_op_start!("push");
/// log_op_start!("write_and_commit", identity = "co01.test01");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use netvault_core::log_op_end;
/// log_op_end!("push", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// The error is borrowed; anything convertible into `ExError` by clone works.
///
/// # Example
///
/// ```
/// # use netvault_core::log_op_error;
/// # use netvault_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Transport).with_message("connection refused");
/// log_op_error!("push", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = ::std::clone::Clone::clone($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            error = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = ::std::clone::Clone::clone($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = netvault_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            error = %ex_err,
            $($field)*
        );
    }};
}
