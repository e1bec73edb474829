//! The option model: GET_OPTION_DESCRIPTORS, the CONTROL_OPTION
//! get/set/set-auto dispatch, and the descriptor cache invalidated on
//! the reload-options info bit.

use std::io::{Read, Write};

use log::debug;

use crate::auth::CredentialProvider;
use crate::codec::OptionDescriptor;
use crate::enums::{ControlAction, ControlInfo, RpcOp, ValueType};
use crate::error::Status;
use crate::fixed::Fixed;
use crate::session::Session;
use crate::wire;
use crate::Error;

use super::DeviceHandle;

/// An option descriptor, as returned by [`list_options`]. Alias kept for
/// callers who think in terms of "the device's Nth option" rather than
/// the wire record's name.
pub type DeviceOption = OptionDescriptor;

/// A value exchanged with CONTROL_OPTION.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(Vec<i32>),
    Fixed(Vec<Fixed>),
    String(String),
    Button,
}

/// The outcome of a CONTROL_OPTION call: the value the backend actually
/// holds after the call (authoritative even when `info` marks it
/// inexact) plus the raw info bits.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlResult {
    pub value: OptionValue,
    pub info: ControlInfo,
}

/// GET_OPTION_DESCRIPTORS. Returns the cached descriptor list,
/// re-fetching first if a prior CONTROL_OPTION call set the
/// reload-options info bit.
pub fn list_options<C: CredentialProvider>(
    session: &mut Session<C>,
    device: &mut DeviceHandle,
) -> Result<&[OptionDescriptor], Error> {
    session.require_device_open()?;
    if device.is_cache_stale() {
        debug!("dispatching {:?}", RpcOp::GetOptionDescriptors);
        wire::write_word(&mut session.control, RpcOp::GetOptionDescriptors.to_word())?;
        wire::write_word(&mut session.control, device.handle())?;
        session.control.flush()?;

        let len = wire::read_word(&mut session.control)? as usize;
        let _discard = wire::read_word(&mut session.control)?;

        let mut group = None;
        let mut descriptors = Vec::with_capacity(len.saturating_sub(1));
        for _ in 0..len.saturating_sub(1) {
            descriptors.push(OptionDescriptor::read(&mut session.control, &mut group)?);
        }
        device.store_descriptors(descriptors);
    }
    Ok(device.cached_descriptors().expect("just populated above"))
}

/// CONTROL_OPTION with action = get.
pub fn get_option<C: CredentialProvider>(
    session: &mut Session<C>,
    device: &mut DeviceHandle,
    index: usize,
) -> Result<ControlResult, Error> {
    control_option(session, device, index, ControlAction::Get, None)
}

/// CONTROL_OPTION with action = set. The value must match
/// the descriptor's declared type or the call fails with
/// [`Error::ConstraintViolation`] before anything is sent on the wire.
pub fn set_option<C: CredentialProvider>(
    session: &mut Session<C>,
    device: &mut DeviceHandle,
    index: usize,
    value: OptionValue,
) -> Result<ControlResult, Error> {
    control_option(session, device, index, ControlAction::Set, Some(value))
}

/// CONTROL_OPTION with action = set-auto; never carries a payload.
pub fn set_option_auto<C: CredentialProvider>(
    session: &mut Session<C>,
    device: &mut DeviceHandle,
    index: usize,
) -> Result<ControlResult, Error> {
    control_option(session, device, index, ControlAction::SetAuto, None)
}

fn control_option<C: CredentialProvider>(
    session: &mut Session<C>,
    device: &mut DeviceHandle,
    index: usize,
    action: ControlAction,
    value: Option<OptionValue>,
) -> Result<ControlResult, Error> {
    session.require_device_open()?;
    list_options(session, device)?;
    let descriptor = device
        .cached_descriptors()
        .and_then(|descriptors| descriptors.get(index))
        .ok_or_else(|| Error::invalid_state("option index out of range"))?
        .clone();

    let (value_type_word, value_size, payload) = match (action, value) {
        (ControlAction::Set, Some(v)) => {
            let (size, bytes) = encode_value(&v, &descriptor)?;
            (descriptor.value_type.to_word(), size, bytes)
        }
        (ControlAction::Get, None) => (
            descriptor.value_type.to_word(),
            descriptor.element_size,
            vec![0u8; descriptor.element_size as usize],
        ),
        (ControlAction::SetAuto, None) => (descriptor.value_type.to_word(), 0, Vec::new()),
        _ => return Err(Error::invalid_state("action does not match the supplied value")),
    };

    let handle = device.handle();
    let send = |session: &mut Session<C>| -> Result<(), Error> {
        debug!("dispatching {:?}", RpcOp::ControlOption);
        wire::write_word(&mut session.control, RpcOp::ControlOption.to_word())?;
        wire::write_word(&mut session.control, handle)?;
        wire::write_word(&mut session.control, index as u32)?;
        wire::write_word(&mut session.control, action.to_word())?;
        wire::write_word(&mut session.control, value_type_word)?;
        wire::write_word(&mut session.control, value_size)?;
        session.control.write_all(&payload)?;
        session.control.flush()?;
        Ok(())
    };

    send(session)?;
    let (mut status, mut info, mut result_value, mut resource) =
        read_control_reply(&mut session.control)?;

    if !resource.is_empty() {
        session.authorize(&resource)?;
        send(session)?;
        let retried = read_control_reply(&mut session.control)?;
        status = retried.0;
        info = retried.1;
        result_value = retried.2;
        resource = retried.3;
    }
    let _ = resource;
    status.into_result()?;

    if info.contains(ControlInfo::RELOAD_OPTIONS) {
        device.invalidate();
    }

    Ok(ControlResult {
        value: result_value,
        info,
    })
}

fn read_control_reply(
    r: &mut impl Read,
) -> Result<(Status, ControlInfo, OptionValue, String), Error> {
    let status = Status::from_word(wire::read_word(r)?);
    let info = ControlInfo::from_bits_retain(wire::read_word(r)?);
    let reply_type = ValueType::from_word(wire::read_word(r)?);
    let value_size = wire::read_word(r)?;
    let value = decode_value(r, reply_type, value_size)?;
    let resource = wire::read_string(r)?;
    Ok((status, info, value, resource))
}

fn encode_value(value: &OptionValue, descriptor: &OptionDescriptor) -> Result<(u32, Vec<u8>), Error> {
    match (value, descriptor.value_type) {
        (OptionValue::Bool(b), ValueType::Bool) => {
            let mut buf = Vec::new();
            wire::write_word(&mut buf, *b as u32)?;
            Ok((4, buf))
        }
        (OptionValue::Int(values), ValueType::Int) => {
            let mut buf = Vec::new();
            for &v in values {
                wire::write_word(&mut buf, v as u32)?;
            }
            Ok((buf.len() as u32, buf))
        }
        (OptionValue::Fixed(values), ValueType::Fixed) => {
            let mut buf = Vec::new();
            for &v in values {
                wire::write_word(&mut buf, v.to_word())?;
            }
            Ok((buf.len() as u32, buf))
        }
        (OptionValue::String(s), ValueType::String) => {
            let mut buf = Vec::new();
            wire::write_string(&mut buf, s)?;
            Ok((buf.len() as u32, buf))
        }
        (OptionValue::Button, ValueType::Button) => Ok((0, Vec::new())),
        _ => Err(Error::constraint_violation(
            "value does not match the option's declared type",
        )),
    }
}

fn decode_value(
    r: &mut impl Read,
    value_type: ValueType,
    value_size: u32,
) -> Result<OptionValue, Error> {
    match value_type {
        ValueType::Bool => Ok(OptionValue::Bool(wire::read_word(r)? != 0)),
        ValueType::Int => {
            let count = (value_size / 4) as usize;
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(wire::read_word(r)? as i32);
            }
            Ok(OptionValue::Int(values))
        }
        ValueType::Fixed => {
            let count = (value_size / 4) as usize;
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(Fixed::from_word(wire::read_word(r)?));
            }
            Ok(OptionValue::Fixed(values))
        }
        ValueType::String => {
            let _ = value_size;
            Ok(OptionValue::String(wire::read_string(r)?))
        }
        ValueType::Button => Ok(OptionValue::Button),
        ValueType::Group | ValueType::Unknown(_) => Err(Error::invalid_state(
            "option reply carried a group or unknown value type",
        )),
    }
}
