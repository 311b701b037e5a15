//! 音频系统
//!
//! 维护声音注册表与播放句柄的逻辑状态（音量、声像、速度、循环）。
//! 实际的解码与输出不在本 crate 范围内。

pub mod script_interface;

use std::collections::HashMap;
use std::path::Path;

use crate::core::error::{AudioError, AudioResult};

pub use script_interface::AudioScriptInterface;

/// 已注册声音的句柄
pub type SoundId = u32;
/// 一次播放的句柄
pub type PlaybackId = u64;

/// 播放参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub looped: bool,
    pub volume: f32,
    pub balance: f32,
    pub speed: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            looped: false,
            volume: 1.0,
            balance: 0.0,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Playback {
    sound: SoundId,
    settings: PlaybackSettings,
    playing: bool,
}

/// 音频系统
#[derive(Debug)]
pub struct AudioSystem {
    sounds: Vec<String>,
    sound_ids: HashMap<String, SoundId>,
    playbacks: HashMap<PlaybackId, Playback>,
    next_playback: PlaybackId,
    master_volume: f32,
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self {
            sounds: Vec::new(),
            sound_ids: HashMap::new(),
            playbacks: HashMap::new(),
            next_playback: 1,
            master_volume: 1.0,
        }
    }
}

fn check_volume(volume: f32) -> AudioResult<f32> {
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(AudioError::InvalidVolume(volume))
    }
}

impl AudioSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn startup(&mut self) {
        tracing::info!(target: "audio", "audio system started");
    }

    pub fn shutdown(&mut self) {
        let active = self.playbacks.values().filter(|p| p.playing).count();
        self.playbacks.clear();
        self.sounds.clear();
        self.sound_ids.clear();
        tracing::info!(target: "audio", stopped = active, "audio system shut down");
    }

    pub fn begin_frame(&mut self) {}

    /// 回收已停止的播放
    pub fn end_frame(&mut self) {
        self.playbacks.retain(|_, playback| playback.playing);
    }

    /// 按文件路径注册声音；同一路径返回同一个 id
    pub fn create_or_get_sound(&mut self, path: &str) -> AudioResult<SoundId> {
        if let Some(id) = self.sound_ids.get(path) {
            return Ok(*id);
        }
        if !Path::new(path).is_file() {
            return Err(AudioError::FileNotFound(path.to_string()));
        }
        let id = self.sounds.len() as SoundId;
        self.sounds.push(path.to_string());
        self.sound_ids.insert(path.to_string(), id);
        tracing::debug!(target: "audio", path, id, "sound registered");
        Ok(id)
    }

    pub fn sound_path(&self, id: SoundId) -> Option<&str> {
        self.sounds.get(id as usize).map(String::as_str)
    }

    pub fn start_sound(
        &mut self,
        sound: SoundId,
        settings: PlaybackSettings,
    ) -> AudioResult<PlaybackId> {
        if self.sound_path(sound).is_none() {
            return Err(AudioError::UnknownSound(sound));
        }
        check_volume(settings.volume)?;
        let id = self.next_playback;
        self.next_playback += 1;
        self.playbacks.insert(
            id,
            Playback {
                sound,
                settings,
                playing: true,
            },
        );
        tracing::trace!(target: "audio", sound, playback = id, looped = settings.looped, "sound started");
        Ok(id)
    }

    fn playback_mut(&mut self, id: PlaybackId) -> AudioResult<&mut Playback> {
        self.playbacks
            .get_mut(&id)
            .ok_or(AudioError::UnknownPlayback(id))
    }

    pub fn stop_sound(&mut self, id: PlaybackId) -> AudioResult<()> {
        self.playback_mut(id)?.playing = false;
        Ok(())
    }

    pub fn set_volume(&mut self, id: PlaybackId, volume: f32) -> AudioResult<()> {
        let volume = check_volume(volume)?;
        self.playback_mut(id)?.settings.volume = volume;
        Ok(())
    }

    pub fn set_balance(&mut self, id: PlaybackId, balance: f32) -> AudioResult<()> {
        if !(-1.0..=1.0).contains(&balance) {
            return Err(AudioError::InvalidBalance(balance));
        }
        self.playback_mut(id)?.settings.balance = balance;
        Ok(())
    }

    pub fn set_speed(&mut self, id: PlaybackId, speed: f32) -> AudioResult<()> {
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(AudioError::InvalidSpeed(speed));
        }
        self.playback_mut(id)?.settings.speed = speed;
        Ok(())
    }

    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.get(&id).is_some_and(|p| p.playing)
    }

    pub fn playback_settings(&self, id: PlaybackId) -> Option<PlaybackSettings> {
        self.playbacks.get(&id).map(|p| p.settings)
    }

    pub fn playback_sound(&self, id: PlaybackId) -> Option<SoundId> {
        self.playbacks.get(&id).map(|p| p.sound)
    }

    pub fn active_playbacks(&self) -> usize {
        self.playbacks.values().filter(|p| p.playing).count()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) -> AudioResult<()> {
        self.master_volume = check_volume(volume)?;
        Ok(())
    }

    /// 播放最终音量（播放音量 × 主音量）
    pub fn effective_volume(&self, id: PlaybackId) -> Option<f32> {
        self.playback_settings(id)
            .map(|settings| settings.volume * self.master_volume)
    }
}
