//! Local media device checks.
//!
//! Devices are probed before any call session record is written, so a user
//! with no microphone never rings anyone.

use std::path::Path;

use crate::error::ChatError;
use crate::models::CallKind;

pub trait DeviceProbe: Send + Sync {
    fn has_microphone(&self) -> bool;
    fn has_camera(&self) -> bool;
}

/// Probe backed by the kernel device nodes: ALSA capture PCMs under
/// /dev/snd (names like pcmC0D0c), V4L2 capture nodes as /dev/video*.
pub struct SystemDevices;

impl DeviceProbe for SystemDevices {
    fn has_microphone(&self) -> bool {
        dir_has_entry("/dev/snd", |name| {
            name.starts_with("pcmC") && name.ends_with('c')
        })
    }

    fn has_camera(&self) -> bool {
        dir_has_entry("/dev", |name| name.starts_with("video"))
    }
}

fn dir_has_entry(dir: &str, matches: impl Fn(&str) -> bool) -> bool {
    let Ok(entries) = Path::new(dir).read_dir() else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| matches(&entry.file_name().to_string_lossy()))
}

/// Verify the devices a call of `kind` needs, with the user-facing
/// explanation the product shows.
pub fn ensure_devices(kind: CallKind, probe: &dyn DeviceProbe) -> Result<(), ChatError> {
    match kind {
        CallKind::Audio => {
            if !probe.has_microphone() {
                return Err(ChatError::DeviceUnavailable(
                    "Microphone required for voice and video calls. Make sure your audio \
                     device (headset, speakers, or microphone) is connected and working."
                        .to_string(),
                ));
            }
        }
        CallKind::Video => {
            if !probe.has_microphone() || !probe.has_camera() {
                return Err(ChatError::DeviceUnavailable(
                    "Camera and microphone required for video calls. Ensure your camera is \
                     enabled and functioning for clear video communication."
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        microphone: bool,
        camera: bool,
    }

    impl DeviceProbe for Fixed {
        fn has_microphone(&self) -> bool {
            self.microphone
        }
        fn has_camera(&self) -> bool {
            self.camera
        }
    }

    #[test]
    fn test_audio_call_needs_only_a_microphone() {
        let probe = Fixed {
            microphone: true,
            camera: false,
        };
        assert!(ensure_devices(CallKind::Audio, &probe).is_ok());
        assert!(matches!(
            ensure_devices(CallKind::Video, &probe),
            Err(ChatError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_video_call_needs_both_devices() {
        let probe = Fixed {
            microphone: true,
            camera: true,
        };
        assert!(ensure_devices(CallKind::Video, &probe).is_ok());

        let no_mic = Fixed {
            microphone: false,
            camera: true,
        };
        assert!(matches!(
            ensure_devices(CallKind::Video, &no_mic),
            Err(ChatError::DeviceUnavailable(_))
        ));
        assert!(matches!(
            ensure_devices(CallKind::Audio, &no_mic),
            Err(ChatError::DeviceUnavailable(_))
        ));
    }
}
