// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Error types for the storm watchdog.

/// A power-management transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PmOp {
    /// Idle suspend; powers the device off.
    Suspend,
    /// Active resume; powers the device back on.
    Resume,
}

/// Errors raised while sampling the interrupt line or recovering the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bus, device or interrupt descriptor is absent.
    NotFound,
    /// The located device is not of the expected device class.
    WrongType,
    /// Invalid configuration or a corrupted counter reading.
    Invalid,
    /// A suspend or resume callback failed with the given errno.
    PmFailure {
        /// The transition that failed.
        op: PmOp,
        /// Errno reported by the callback.
        errno: i32,
    },
    /// The device exposes no power-management callbacks.
    PmUnsupported,
    /// An execution context (timer or worker) could not be started.
    Spawn,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotFound => write!(f, "no such device"),
            Error::WrongType => write!(f, "unexpected device type"),
            Error::Invalid => write!(f, "invalid argument"),
            Error::PmFailure { op, errno } => write!(f, "failed to {op}: {errno}"),
            Error::PmUnsupported => write!(f, "device has no power management"),
            Error::Spawn => write!(f, "failed to start execution context"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience type alias for Result with [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
