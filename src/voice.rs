// Windchime
// Copyright (C) 2026  The Windchime Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Sounding the chime's tubes.
//!
//! The rest of the crate only needs to strike a note at an amplitude, which is what
//! [`ChimeVoice`] describes. Envelopes, overlapping strikes and mixing are the voice's own concern.
//!
//! [`OscChimeVoice`] strikes notes by creating a new synth on a SuperCollider server for every
//! strike. The server must have a synth definition loaded that accepts `freq` and `amp` controls
//! and frees itself when its envelope finishes, for example:
//!
//! ```text
//! SynthDef(\chime, { |freq = 440, amp = 0.5|
//!     var env = EnvGen.kr(Env.perc(0.001, 4), doneAction: 2);
//!     Out.ar(0, Pan2.ar(Klank.ar(`[[1, 2.76, 5.4], nil, [4, 2, 1]], Impulse.ar(0), freq) * amp * env));
//! }).add;
//! ```

mod message;

use crate::music::Note;
use message::Message;
use rosc::{encoder::encode, OscError, OscPacket};
use std::{
    fmt, io,
    net::{ToSocketAddrs, UdpSocket},
};
use thiserror::Error;

/// A specialized [`Result`] type for voice errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by [`OscChimeVoice`] operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("binding to UDP socket: {0}")]
    UdpBind(io::Error),
    #[error("connecting UDP socket to synth server: {0}")]
    UdpConnect(io::Error),
    #[error("sending strike to synth server: {0}")]
    Send(io::Error),
    #[error("encoding OSC packet: {0:?}")]
    OscEncode(OscError),
}

/// Something that can strike a chime tube.
///
/// `amplitude` is in `0.0..=1.0`. Striking is fire and forget, implementations log their own
/// failures rather than returning them.
///
/// A blanket implementation is provided for closures implementing `FnMut(Note, f32)`.
pub trait ChimeVoice {
    fn strike(&mut self, note: Note, amplitude: f32);
}

impl<F> ChimeVoice for F
where
    F: FnMut(Note, f32),
{
    fn strike(&mut self, note: Note, amplitude: f32) {
        self(note, amplitude)
    }
}

/// Add the new synth to the head of its target group.
const ADD_TO_HEAD: i32 = 0;

/// The default group every SuperCollider server creates.
const DEFAULT_GROUP: i32 = 1;

/// Lets the server pick the synth ID.
const AUTO_SYNTH_ID: i32 = -1;

/// A chime voice played by a SuperCollider server over UDP.
pub struct OscChimeVoice {
    socket: UdpSocket,
    synthdef_name: String,
    loudness: f32,
}

impl fmt::Debug for OscChimeVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OscChimeVoice")
            .field("socket", &self.socket)
            .field("synthdef_name", &self.synthdef_name)
            .field("loudness", &self.loudness)
            .finish()
    }
}

impl OscChimeVoice {
    /// Connects to an externally running server using the given UDP address.
    ///
    /// This function will not boot a SuperCollider server. You must start one separately.
    ///
    /// # Arguments
    ///
    /// * `server_address` - The UDP address of the SuperCollider server.
    /// * `synthdef_name` - The synth definition to create for every strike.
    ///
    /// # Errors
    ///
    /// Returns an error if a UDP socket cannot be created or if the UDP socket cannot connect to
    /// the `server_address`.
    pub fn connect<A: ToSocketAddrs>(
        server_address: A,
        synthdef_name: impl Into<String>,
    ) -> Result<OscChimeVoice> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::UdpBind)?;
        socket.connect(server_address).map_err(Error::UdpConnect)?;
        Ok(OscChimeVoice {
            socket,
            synthdef_name: synthdef_name.into(),
            loudness: 1.0,
        })
    }

    /// Scale every strike's amplitude by `loudness`. Defaults to 1.0.
    pub fn loudness(mut self, loudness: f32) -> Self {
        self.loudness = loudness.max(0.0).min(1.0);
        self
    }

    fn strike_packet(&self, note: Note, amplitude: f32) -> OscPacket {
        Message::addr("/s_new")
            .arg(self.synthdef_name.clone())
            .arg(AUTO_SYNTH_ID)
            .arg(ADD_TO_HEAD)
            .arg(DEFAULT_GROUP)
            .control("freq", note.frequency())
            .control("amp", amplitude * self.loudness)
            .into_packet()
    }

    fn send(&self, packet: &OscPacket) -> Result<()> {
        let bytes = encode(packet).map_err(Error::OscEncode)?;
        self.socket.send(&bytes).map_err(Error::Send)?;
        Ok(())
    }
}

impl ChimeVoice for OscChimeVoice {
    fn strike(&mut self, note: Note, amplitude: f32) {
        let packet = self.strike_packet(note, amplitude);
        log::trace!("strike {} at {:.2}", note, amplitude);
        if let Err(err) = self.send(&packet) {
            log::warn!("{}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rosc::{decoder::decode, OscType};
    use std::time::Duration;

    #[test]
    fn strike_sends_s_new() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut voice = OscChimeVoice::connect(server.local_addr().unwrap(), "chime")
            .unwrap()
            .loudness(0.5);

        voice.strike(Note::new(69).unwrap(), 0.8);

        let mut buffer = [0_u8; 1024];
        let len = server.recv(&mut buffer).unwrap();
        let message = match decode(&buffer[..len]).unwrap() {
            OscPacket::Message(message) => message,
            OscPacket::Bundle(bundle) => panic!("unexpected bundle: {:?}", bundle),
        };
        assert_eq!(message.addr, "/s_new");
        assert_eq!(
            message.args,
            vec![
                OscType::String("chime".to_owned()),
                OscType::Int(-1),
                OscType::Int(0),
                OscType::Int(1),
                OscType::String("freq".to_owned()),
                OscType::Float(440.0),
                OscType::String("amp".to_owned()),
                OscType::Float(0.4),
            ]
        );
    }

    #[test]
    fn loudness_is_clamped() {
        let voice = OscChimeVoice::connect("127.0.0.1:57110", "chime")
            .unwrap()
            .loudness(3.0);
        assert_eq!(voice.loudness, 1.0);
    }
}
