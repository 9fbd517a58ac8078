// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Receiving MIDI from the input ports of the system through `midir`.

use std::convert::TryFrom;
use std::io;
use std::sync::mpsc::Sender;

use log::{debug, info};
use midir::{Ignore, MidiInput, MidiInputConnection};

use syn_midi::live::TransportEvent;
use syn_midi::midi::MidiError;

fn midi_error<E: std::fmt::Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

/// Names of all MIDI input ports, in the order used for selecting them by index.
pub fn list_ports() -> io::Result<Vec<String>> {
    let midi_in = MidiInput::new("synmidi scanner").map_err(midi_error)?;
    Ok(port_names(&midi_in))
}

fn port_names(midi_in: &MidiInput) -> Vec<String> {
    midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect()
}

/// Pick a port by its index, or else by the first name containing `selector`.
pub fn select_port(names: &[String], selector: &str) -> Option<usize> {
    match selector.parse::<usize>() {
        Ok(index) if index < names.len() => Some(index),
        _ => names.iter().position(|name| name.contains(selector)),
    }
}

/// Turn a message delivered by `midir` into a transport event.
///
/// Only three byte channel messages are passed on.
pub fn message_event(message: &[u8]) -> Option<TransportEvent> {
    match <[u8; 3]>::try_from(message) {
        Ok(bytes) => Some(TransportEvent::Message(bytes)),
        Err(_) => {
            debug!(
                "skipping {:02x?}: {}",
                message,
                MidiError::MalformedMessage { len: message.len() }
            );
            None
        }
    }
}

/// An open connection to a MIDI input port.
///
/// Messages are sent as [`TransportEvent`]s from the `midir` callback thread.
/// Dropping the connection closes the port and reports the disconnect.
pub struct MidiConnection {
    port: String,
    connection: Option<MidiInputConnection<()>>,
    /// Separate client for checking whether the port still exists.
    scanner: MidiInput,
    events: Sender<TransportEvent>,
}

impl MidiConnection {
    /// Connect to the port chosen by `selector`, see [`select_port`].
    pub fn open(selector: &str, events: Sender<TransportEvent>) -> io::Result<Self> {
        let mut midi_in = MidiInput::new("synmidi input").map_err(midi_error)?;
        midi_in.ignore(Ignore::Sysex | Ignore::Time);

        let ports = midi_in.ports();
        let names = port_names(&midi_in);
        let index = select_port(&names, selector).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("MIDI input '{}' not found", selector),
            )
        })?;
        let port = names[index].clone();
        let midi_port = ports
            .get(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "MIDI input vanished"))?;

        let callback_events = events.clone();
        let connection = midi_in
            .connect(
                midi_port,
                "synmidi-input",
                move |_timestamp_us, message, _| {
                    if let Some(event) = message_event(message) {
                        // the receiver is gone only while shutting down
                        let _ = callback_events.send(event);
                    }
                },
                (),
            )
            .map_err(midi_error)?;
        info!("listening on MIDI input {}", port);

        let scanner = MidiInput::new("synmidi scanner").map_err(midi_error)?;
        let _ = events.send(TransportEvent::Connected { port: port.clone() });
        Ok(MidiConnection {
            port,
            connection: Some(connection),
            scanner,
            events,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the port is still offered by the system.
    pub fn is_present(&self) -> bool {
        port_names(&self.scanner)
            .iter()
            .any(|name| *name == self.port)
    }
}

impl Drop for MidiConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            let _ = self.events.send(TransportEvent::Disconnected {
                port: self.port.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "Midi Through:Midi Through Port-0 14:0".to_owned(),
            "Keystation 49:Keystation 49 MIDI 1 20:0".to_owned(),
        ]
    }

    #[test]
    fn select_by_index() {
        assert_eq!(select_port(&names(), "0"), Some(0));
        assert_eq!(select_port(&names(), "1"), Some(1));
    }

    #[test]
    fn select_by_name() {
        assert_eq!(select_port(&names(), "Keystation"), Some(1));
        assert_eq!(select_port(&names(), "Midi Through"), Some(0));
        // out of range indices are treated as names
        assert_eq!(select_port(&names(), "20"), Some(1));
        assert_eq!(select_port(&names(), "Launchpad"), None);
        assert_eq!(select_port(&[], "0"), None);
    }

    #[test]
    fn channel_messages_are_forwarded() {
        assert_eq!(
            message_event(&[0x90, 60, 100]),
            Some(TransportEvent::Message([0x90, 60, 100]))
        );
        assert_eq!(
            message_event(&[0xb0, 64, 127]),
            Some(TransportEvent::Message([0xb0, 64, 127]))
        );
    }

    #[test]
    fn other_lengths_are_skipped() {
        assert_eq!(message_event(&[0xc0, 5]), None);
        assert_eq!(message_event(&[0xfe]), None);
        assert_eq!(message_event(&[]), None);
    }
}
