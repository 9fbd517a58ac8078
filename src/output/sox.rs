// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Easy interface for getting sound to play using a sox subprocess.

use std::io;
use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::wave::AudioBuffer;

pub enum SoxTarget<'a> {
    /// Play on the default speakers.
    Play,
    /// Write to a file in any format sox supports.
    File(&'a Path),
}

/// Streams audio buffers into a `play` or `sox` process.
pub struct SoxSink {
    player: Child,
    audio_stream: Option<ChildStdin>,
    buffer: Vec<u8>,
}

impl SoxSink {
    pub fn new(sample_rate: i32, target: SoxTarget) -> io::Result<Self> {
        let sample_rate_str = format!("{}", sample_rate);
        let input_args = &[
            "-R", // make the output reproducible
            "--channels",
            "2",
            "--rate",
            &sample_rate_str,
            "--type",
            "f64",
            "/dev/stdin",
        ];

        let mut player = match target {
            SoxTarget::Play => Command::new("play")
                .args(input_args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?,
            SoxTarget::File(outfile) => Command::new("sox")
                .args(input_args)
                .arg(outfile)
                .stdin(Stdio::piped())
                .spawn()?,
        };

        let audio_stream = player.stdin.take();
        if audio_stream.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "sox was started without stdin",
            ));
        }

        Ok(Self {
            player,
            audio_stream,
            buffer: Vec::new(),
        })
    }

    /// Send one buffer of audio to sox.
    pub fn write(&mut self, audio: &AudioBuffer) -> io::Result<()> {
        if self.buffer.len() < audio.byte_len() {
            self.buffer.resize(audio.byte_len(), 0);
        }
        let n = audio.copy_bytes_to(&mut self.buffer);
        let stream = self
            .audio_stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sox stream closed"))?;
        stream.write_all(&self.buffer[..n * 16])?;
        stream.flush()
    }

    /// Close the stream and wait for sox to finish writing or playing.
    pub fn finish(mut self) -> io::Result<()> {
        // sox exits once its input is closed
        drop(self.audio_stream.take());
        let status = self.player.wait()?;
        if status.success() {
            Ok(())
        } else {
            log::error!("sox exited with {}", status);
            Err(io::Error::new(io::ErrorKind::Other, "sox failed"))
        }
    }
}
