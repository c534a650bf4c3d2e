//! Static session description offered when a peer asks for audio.
//!
//! The gateway negotiates voice sessions over SIP, but this agent never
//! opens media sockets; the description advertises a nominal audio
//! endpoint the way a softphone would, and the codecs the device accepts.

/// Builds the audio session description for the given session host.
pub fn static_audio_description(host: &str) -> String {
    format!(
        "v=0\r\n\
o=- 0 0 IN IP4 {host}\r\n\
s=skylink\r\n\
c=IN IP4 {host}\r\n\
t=0 0\r\n\
m=audio 8000 RTP/AVP 3 110 8 0 98 101\r\n\
a=rtpmap:110 speex/8000\r\n\
a=rtpmap:98 iLBC/8000\r\n\
a=fmtp:98 mode=20\r\n\
a=rtpmap:101 telephone-event/8000\r\n\
a=fmtp:101 0-15\r\n\
a=sendrecv\r\n"
    )
}

/// Content type the description is labelled with.
pub const AUDIO_DESCRIPTION_CONTENT_TYPE: &str = "application/sdp";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_names_the_session_host() {
        let sdp = static_audio_description("10.0.0.5");
        assert!(sdp.starts_with("v=0\r\n"));
        assert!(sdp.contains("c=IN IP4 10.0.0.5\r\n"));
        assert!(sdp.contains("m=audio 8000 RTP/AVP"));
        assert!(sdp.ends_with("a=sendrecv\r\n"));
    }
}
