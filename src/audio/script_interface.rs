//! 音频系统的脚本接口（全局名 `audio`）

use std::sync::{Mutex, Weak};

use super::{AudioSystem, PlaybackId, PlaybackSettings, SoundId};
use crate::core::utils::lock;
use crate::scripting::extract::{extract_bool, extract_float, extract_int, extract_string};
use crate::scripting::{
    dispatch, method_infos, ExtractionError, MethodError, ScriptArgs, ScriptMethod,
    ScriptMethodInfo, ScriptMethodResult, ScriptValue, ScriptableObject,
};

type MethodOutput = Result<Option<ScriptValue>, MethodError>;

pub struct AudioScriptInterface {
    audio: Weak<Mutex<AudioSystem>>,
}

impl AudioScriptInterface {
    pub fn new(audio: Weak<Mutex<AudioSystem>>) -> Self {
        Self { audio }
    }

    fn with_audio<R>(&self, f: impl FnOnce(&mut AudioSystem) -> R) -> Result<R, MethodError> {
        let audio = self
            .audio
            .upgrade()
            .ok_or(MethodError::Unavailable("audio system"))?;
        let mut audio = lock(&audio);
        Ok(f(&mut audio))
    }

    fn create_or_get_sound(&mut self, args: &ScriptArgs) -> MethodOutput {
        let path = extract_string(args, 0)?;
        let id = self
            .with_audio(|audio| audio.create_or_get_sound(&path))?
            .map_err(|e| MethodError::Failed(e.to_string()))?;
        Ok(Some(ScriptValue::from(id)))
    }

    fn start_sound(&mut self, args: &ScriptArgs) -> MethodOutput {
        let sound = non_negative(args, 0)? as SoundId;
        let looped = extract_bool(args, 1)?;
        let settings = PlaybackSettings {
            looped,
            ..PlaybackSettings::default()
        };
        let playback = self
            .with_audio(|audio| audio.start_sound(sound, settings))?
            .map_err(|e| MethodError::Failed(e.to_string()))?;
        Ok(Some(ScriptValue::from(playback)))
    }

    fn stop_sound(&mut self, args: &ScriptArgs) -> MethodOutput {
        let playback = non_negative(args, 0)? as PlaybackId;
        self.with_audio(|audio| audio.stop_sound(playback))?
            .map_err(|e| MethodError::Failed(e.to_string()))?;
        Ok(None)
    }

    fn set_sound_volume(&mut self, args: &ScriptArgs) -> MethodOutput {
        let playback = non_negative(args, 0)? as PlaybackId;
        let volume = extract_float(args, 1)?;
        self.with_audio(|audio| audio.set_volume(playback, volume))?
            .map_err(|e| MethodError::Failed(e.to_string()))?;
        Ok(None)
    }

    fn is_playing(&mut self, args: &ScriptArgs) -> MethodOutput {
        let playback = non_negative(args, 0)? as PlaybackId;
        self.with_audio(|audio| Some(ScriptValue::from(audio.is_playing(playback))))
    }
}

fn non_negative(args: &ScriptArgs, index: usize) -> Result<u32, ExtractionError> {
    let value = extract_int(args, index)?;
    u32::try_from(value).map_err(|_| ExtractionError::OutOfRange {
        position: format!("argument {}", index),
        value: value as f64,
        expected: "id",
    })
}

const AUDIO_METHODS: &[ScriptMethod<AudioScriptInterface>] = &[
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "createOrGetSound",
            "register a sound file and return its id",
            &["string"],
            "int",
        ),
        handler: AudioScriptInterface::create_or_get_sound,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "startSound",
            "play a sound and return the playback id",
            &["int", "bool"],
            "int",
        ),
        handler: AudioScriptInterface::start_sound,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new("stopSound", "stop a playback", &["int"], "void"),
        handler: AudioScriptInterface::stop_sound,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new(
            "setSoundVolume",
            "set playback volume (0-1)",
            &["int", "float"],
            "void",
        ),
        handler: AudioScriptInterface::set_sound_volume,
    },
    ScriptMethod {
        info: ScriptMethodInfo::new("isPlaying", "whether a playback is active", &["int"], "bool"),
        handler: AudioScriptInterface::is_playing,
    },
];

impl ScriptableObject for AudioScriptInterface {
    fn available_methods(&self) -> Vec<ScriptMethodInfo> {
        method_infos(AUDIO_METHODS)
    }

    fn available_properties(&self) -> Vec<String> {
        vec!["masterVolume".to_string()]
    }

    fn call_method(&mut self, name: &str, args: &ScriptArgs) -> ScriptMethodResult {
        dispatch(self, AUDIO_METHODS, name, args)
    }

    fn get_property(&self, name: &str) -> Option<ScriptValue> {
        match name {
            "masterVolume" => self
                .with_audio(|audio| ScriptValue::from(audio.master_volume()))
                .ok(),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: &ScriptValue) -> bool {
        if name != "masterVolume" {
            return false;
        }
        let Some(volume) = value.as_f64() else {
            return false;
        };
        self.with_audio(|audio| audio.set_master_volume(volume as f32).is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::shared;
    use crate::script_args;
    use std::sync::Arc;

    #[test]
    fn test_sound_round_trip_through_bridge() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let audio = shared(AudioSystem::new());
        let mut bridge = AudioScriptInterface::new(Arc::downgrade(&audio));

        let sound = bridge.call_method("createOrGetSound", &script_args![path]);
        assert_eq!(sound, ScriptMethodResult::success_with(0u32));

        let playback = bridge.call_method("startSound", &script_args![0, true]);
        assert_eq!(playback, ScriptMethodResult::success_with(1u32));
        assert!(lock(&audio).is_playing(1));

        assert!(bridge.call_method("setSoundVolume", &script_args![1, 0.25]).is_success());
        assert_eq!(
            bridge.call_method("isPlaying", &script_args![1]),
            ScriptMethodResult::success_with(true)
        );
        assert!(bridge.call_method("stopSound", &script_args![1]).is_success());
        assert!(!lock(&audio).is_playing(1));
    }

    #[test]
    fn test_errors_are_results() {
        let audio = shared(AudioSystem::new());
        let mut bridge = AudioScriptInterface::new(Arc::downgrade(&audio));

        let missing = bridge.call_method("createOrGetSound", &script_args!["nope.wav"]);
        assert_eq!(
            missing.error_message(),
            Some("createOrGetSound: Audio file not found: nope.wav")
        );
        assert!(bridge.call_method("startSound", &script_args![-1, false]).is_error());
        assert!(bridge.call_method("startSound", &script_args![0]).is_error());
    }

    #[test]
    fn test_master_volume_property() {
        let audio = shared(AudioSystem::new());
        let mut bridge = AudioScriptInterface::new(Arc::downgrade(&audio));
        assert!(bridge.set_property("masterVolume", &ScriptValue::from(0.5)));
        assert_eq!(bridge.get_property("masterVolume"), Some(ScriptValue::from(0.5f32)));
        assert!(!bridge.set_property("masterVolume", &ScriptValue::from(3.0)));
        assert!(!bridge.set_property("masterVolume", &ScriptValue::from("loud")));
        assert!(!bridge.set_property("volume", &ScriptValue::from(0.1)));
    }
}
