//! A player backend for vibrator-style actuators
//!
//! The clip's amplitude envelope is pre-rendered into a Waveform, which is
//! then handed to the driver callbacks. Frequency envelopes can not be
//! played on this kind of actuator and are ignored.

use crate::config::PlaybackConfig;
use crate::datamodel::{emphasis::emphasize, interpolation::Interpolator, latest, waveform::Waveform};
use crate::error::HapticsError;
use crossbeam_channel::{Receiver, Sender};
use once_cell::sync::Lazy;
use std::thread::{self, JoinHandle};

/// Conversion parameters, loaded once. The defaults target an 8 bit
/// vibrator driver, see config::PlaybackConfig.
static PLAYBACK_CONFIG: Lazy<PlaybackConfig> = Lazy::new(PlaybackConfig::load);

// As the callbacks, the tests in this file use closures that capture and modify variables.
// The callbacks need to be FnMut instead of Fn because the tests modify the captured variables.
pub struct Callbacks {
    #[allow(clippy::type_complexity)]
    pub load_clip: Box<dyn FnMut(&[i64], &[i32], bool) -> Result<(), HapticsError> + Send>,
    pub play_clip: Box<dyn FnMut() -> Result<(), HapticsError> + Send>,
    pub stop_clip: Box<dyn FnMut() -> Result<(), HapticsError> + Send>,
    pub unload_clip: Box<dyn FnMut() -> Result<(), HapticsError> + Send>,
    #[allow(clippy::type_complexity)]
    pub seek_clip: Box<dyn FnMut(&[i64], &[i32]) -> Result<(), HapticsError> + Send>,
}

impl Callbacks {
    pub fn new(
        load: impl FnMut(&[i64], &[i32], bool) -> Result<(), HapticsError> + Send + 'static,
        play: impl FnMut() -> Result<(), HapticsError> + Send + 'static,
        stop: impl FnMut() -> Result<(), HapticsError> + Send + 'static,
        unload: impl FnMut() -> Result<(), HapticsError> + Send + 'static,
        seek: impl FnMut(&[i64], &[i32]) -> Result<(), HapticsError> + Send + 'static,
    ) -> Callbacks {
        Callbacks {
            load_clip: Box::new(load),
            play_clip: Box::new(play),
            stop_clip: Box::new(stop),
            unload_clip: Box::new(unload),
            seek_clip: Box::new(seek),
        }
    }
}

fn convert_clip_to_waveform(clip: &latest::DataModel) -> Waveform {
    let config = &*PLAYBACK_CONFIG;

    // Emphasis is rendered into the amplitude envelope, as the driver can
    // only play a plain waveform
    let amplitude_breakpoints = emphasize(
        &clip.signals.continuous.envelopes.amplitude,
        config.emphasis_parameters(),
    );

    let interpolator = Interpolator::new(config.interpolation_parameters());
    let amplitude_breakpoints = interpolator.process(&amplitude_breakpoints);

    Waveform::from_breakpoints(
        &amplitude_breakpoints,
        config.waveform_conversion_parameters(),
    )
}

fn apply_amplitude_multiplication(
    waveform: &Waveform,
    amplitude_multiplication_factor: f32,
) -> Waveform {
    if amplitude_multiplication_factor < 0.0 {
        return (*waveform).clone();
    }

    Waveform {
        timings: waveform.timings.clone(),
        amplitudes: waveform
            .amplitudes
            .iter()
            .map(|amplitude| {
                ((*amplitude as f32 * amplitude_multiplication_factor).min(255.0) as i32)
                    .min(255)
                    .max(0)
            })
            .collect(),
    }
}

/// A command sent from the player thread to the haptic thread
#[allow(clippy::large_enum_variant)]
enum PlayerCommand {
    Load(latest::DataModel),
    Unload,
    Play,
    Stop,
    Seek { seek_time: f32 },
    SetAmplitudeMultiplication { multiplication_factor: f32 },
    Loop { enabled: bool },
    Quit,
}

/// The one function running in the haptic thread.
///
/// This is an infinite loop that waits for the next PlayerCommand to be received
/// in the crossbeam channel, then executes that command.
///
/// Most commands will trigger a matching callback to be called.
fn command_loop(mut callbacks: Callbacks, receiver: Receiver<PlayerCommand>) {
    // "Original" here means the clip and waveform right after loading them with
    // load(), before any seeking or amplitude multiplication is applied
    let mut original_clip: Option<latest::DataModel> = None;
    let mut original_waveform: Option<Waveform> = None;

    let mut amplitude_multiplication_factor: f32 = 1.0;
    let mut is_looping_enabled: bool = false;

    loop {
        match receiver.recv() {
            Ok(command) => match command {
                PlayerCommand::Quit => {
                    // Break out of the loop so that the thread is exited
                    break;
                }

                PlayerCommand::Load(data) => {
                    amplitude_multiplication_factor = 1.0;
                    is_looping_enabled = false;
                    original_clip = Some(data.clone());
                    let waveform = convert_clip_to_waveform(&data);

                    if let Err(error) = (callbacks.load_clip)(
                        &waveform.timings,
                        &waveform.amplitudes,
                        is_looping_enabled,
                    ) {
                        log::error!("Failed to load clip: {}", error);
                    }

                    original_waveform = Some(waveform);
                }

                PlayerCommand::Unload => {
                    original_clip = None;
                    original_waveform = None;

                    if let Err(error) = (callbacks.unload_clip)() {
                        log::error!("Failed to unload clip: {}", error);
                    }
                }

                PlayerCommand::Play => {
                    if let Err(error) = (callbacks.play_clip)() {
                        log::error!("Failed to play clip: {}", error);
                    }
                }

                PlayerCommand::Stop => {
                    if let Err(error) = (callbacks.stop_clip)() {
                        log::error!("Failed to stop playback: {}", error);
                    }
                }

                PlayerCommand::Seek { seek_time } => {
                    // Negative seek times are unsupported on this backend, so clamp to zero
                    let seek_time = seek_time.max(0.0);
                    if !is_looping_enabled {
                        if let Some(clip) = &mut original_clip {
                            let mut clip_truncated = clip.clone();

                            let seek_result = match clip_truncated.truncate_before(seek_time) {
                                Ok(_) => {
                                    let waveform = convert_clip_to_waveform(&clip_truncated);
                                    let waveform = apply_amplitude_multiplication(
                                        &waveform,
                                        amplitude_multiplication_factor,
                                    );
                                    (callbacks.seek_clip)(&waveform.timings, &waveform.amplitudes)
                                }
                                Err(_) => {
                                    // A truncation error means that there are no breakpoints
                                    // after the seek offset value. In this case, we don't want
                                    // to raise an error but to play nothing.
                                    (callbacks.seek_clip)(&[], &[])
                                }
                            };

                            if let Err(error) = seek_result {
                                log::error!("Error seeking clip: {}", error);
                            }
                        }
                    }
                }

                PlayerCommand::SetAmplitudeMultiplication {
                    multiplication_factor,
                } => {
                    if let Some(original_waveform) = &original_waveform {
                        amplitude_multiplication_factor = multiplication_factor;
                        let waveform = apply_amplitude_multiplication(
                            original_waveform,
                            amplitude_multiplication_factor,
                        );

                        if let Err(error) = (callbacks.load_clip)(
                            &waveform.timings,
                            &waveform.amplitudes,
                            is_looping_enabled,
                        ) {
                            log::error!(
                                "Failed to load clip for changing amplitude multiplication: {}",
                                error
                            );
                        }
                    }
                }

                PlayerCommand::Loop { enabled } => {
                    is_looping_enabled = enabled;
                    if let Some(original_waveform) = &original_waveform {
                        if let Err(error) = (callbacks.load_clip)(
                            &original_waveform.timings,
                            &original_waveform.amplitudes,
                            is_looping_enabled,
                        ) {
                            log::error!("Failed to load clip for looping: {}", error);
                        }
                    }
                }
            },

            // This case shouldn't really happen, the Player is supposed to disconnect properly by
            // sending the Quit command
            Err(err) => {
                log::error!("Error receiving haptic player command: {}", err);
                break;
            }
        }
    }
}

/// Plays pre-authored haptic clips by invoking the callbacks provided in Player::new()
/// from a separate thread.
///
/// Internally, a dedicated thread is started, running a loop that receives `PlayerCommand`s
/// from the player over a crossbeam channel. This thread is referred to as the "haptic thread".
/// The haptic thread calls the appropriate callback that matches the command it received.
pub struct Player {
    sender: Sender<PlayerCommand>,

    /// JoinHandle of the haptic thread, used to properly join it when dropping the Player
    join_handle: Option<JoinHandle<()>>,

    clip_loaded: bool,
}

impl Drop for Player {
    /// Quit the haptic thread and wait for it to complete when dropping the player
    fn drop(&mut self) {
        match self.send_command(PlayerCommand::Quit, "Quit") {
            Ok(()) => {
                if let Some(join_handle) = self.join_handle.take() {
                    if join_handle.join().is_err() {
                        log::error!("Unable to join haptic thread.");
                    }
                }
            }
            Err(err) => log::error!("Unable to quit haptic thread: {}", err),
        }
    }
}

impl Player {
    pub fn new(callbacks: Callbacks) -> Result<Player, HapticsError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let join_handle = thread::Builder::new()
            .name("haptics".to_string())
            .spawn(move || command_loop(callbacks, receiver))
            .map_err(|e| HapticsError::ThreadFailure {
                reason: format!("Unable to start haptic thread: {}", e),
            })?;

        Ok(Player {
            sender,
            join_handle: Some(join_handle),
            clip_loaded: false,
        })
    }

    fn send_command(
        &self,
        command: PlayerCommand,
        command_name: &str,
    ) -> Result<(), HapticsError> {
        self.sender
            .send(command)
            .map_err(|e| HapticsError::ThreadFailure {
                reason: format!(
                    "Unable to send \"{}\" command to haptic thread: {}",
                    command_name, e
                ),
            })
    }
}

impl crate::players::PreAuthoredClipPlayback for Player {
    fn load(&mut self, data_model: latest::DataModel) -> Result<(), HapticsError> {
        self.send_command(PlayerCommand::Load(data_model), "Load")?;
        self.clip_loaded = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), HapticsError> {
        if !self.clip_loaded {
            return Err(HapticsError::no_clip("play"));
        }
        self.send_command(PlayerCommand::Play, "Play")
    }

    fn stop(&mut self) -> Result<(), HapticsError> {
        if self.clip_loaded {
            self.send_command(PlayerCommand::Stop, "Stop")
        } else {
            Ok(())
        }
    }

    fn unload(&mut self) -> Result<(), HapticsError> {
        self.send_command(PlayerCommand::Unload, "Unload")?;
        self.clip_loaded = false;
        Ok(())
    }

    fn seek(&mut self, seek_time: f32) -> Result<(), HapticsError> {
        if !self.clip_loaded {
            return Err(HapticsError::no_clip("seek"));
        }

        self.send_command(PlayerCommand::Seek { seek_time }, "Seek")
    }

    fn set_amplitude_multiplication(
        &mut self,
        multiplication_factor: f32,
    ) -> Result<(), HapticsError> {
        if !self.clip_loaded {
            return Err(HapticsError::no_clip("set_amplitude_multiplication"));
        }

        self.send_command(
            PlayerCommand::SetAmplitudeMultiplication {
                multiplication_factor,
            },
            "SetAmplitudeMultiplication",
        )
    }

    fn set_frequency_shift(&mut self, _shift: f32) -> Result<(), HapticsError> {
        // This backend has no frequency control, the shift is silently ignored
        Ok(())
    }

    fn set_looping(&mut self, enabled: bool) -> Result<(), HapticsError> {
        if !self.clip_loaded {
            return Err(HapticsError::no_clip("set_looping"));
        }

        self.send_command(PlayerCommand::Loop { enabled }, "Loop")
    }
}
