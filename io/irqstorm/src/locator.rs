// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Device lookup by bus and name.

use crate::{
    error::{Error, Result},
    platform::{BusKind, DeviceRef, DeviceRegistry, DeviceType},
};

/// Finds the top-level device `name` on `bus`.
pub fn find_device<'a, R: DeviceRegistry + ?Sized>(
    registry: &'a R,
    bus: BusKind,
    name: &str,
) -> Result<DeviceRef<'a, R>> {
    match registry.find_device_by_name(bus, name) {
        Some(raw) => Ok(DeviceRef::new(registry, raw)),
        None => {
            error!("{bus:?} device {name} not found");
            Err(Error::NotFound)
        }
    }
}

/// Finds `child_name` below the `bus_name` device on `bus` and checks that it
/// is of class `expected`.
///
/// The parent reference is dropped before returning; the returned child
/// reference is released when it goes out of scope.
pub fn locate<'a, R: DeviceRegistry + ?Sized>(
    registry: &'a R,
    bus: BusKind,
    bus_name: &str,
    child_name: &str,
    expected: DeviceType,
) -> Result<DeviceRef<'a, R>> {
    let parent = find_device(registry, bus, bus_name)?;
    let Some(child) = parent.into_child(child_name) else {
        error!("{child_name} not found under {bus_name}");
        return Err(Error::NotFound);
    };

    let ty = child.device_type();
    if ty != expected {
        error!("{child_name} is {ty:?}, expected {expected:?}");
        return Err(Error::WrongType);
    }
    Ok(child)
}
