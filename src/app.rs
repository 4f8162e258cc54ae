/// Front panel: port picker, play/stop button, step LEDs and the lane grid
use eframe::egui;

use drumbox::midi::Tee;
use drumbox::{
    midi_note_name, AudioMonitor, ByteSink, Channel, Config, MidiPort, Pattern, PlaybackEngine,
    PlaybackEvent, Symbol, TempoClock, VelocityTable,
};

pub fn run(pattern: Pattern, config: Config) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([860.0, 420.0])
            .with_title("drumbox"),
        ..Default::default()
    };

    eframe::run_native(
        "drumbox",
        options,
        Box::new(|_cc| Ok(Box::new(DrumboxApp::new(pattern, config)))),
    )
}

struct DrumboxApp {
    pattern: Pattern,
    config: Config,
    monitor: AudioMonitor,
    playback_engine: PlaybackEngine,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    monitor_enabled: bool,
    current_visual_step: Option<usize>,
    status: Option<(bool, String)>,
}

impl DrumboxApp {
    fn new(pattern: Pattern, config: Config) -> Self {
        let available_midi_ports = MidiPort::available_ports();
        let selected_port = match config.port.as_deref() {
            Some(selector) => available_midi_ports
                .iter()
                .position(|name| name.to_lowercase().contains(&selector.to_lowercase())),
            None => (!available_midi_ports.is_empty()).then_some(0),
        };
        let monitor = AudioMonitor::default();
        let monitor_enabled = selected_port.is_none() && monitor.is_audible();

        Self {
            pattern,
            config,
            monitor,
            playback_engine: PlaybackEngine::new(),
            available_midi_ports,
            selected_port,
            monitor_enabled,
            current_visual_step: None,
            status: None,
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.playback_engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => {
                    self.current_visual_step = Some(step);
                }
                PlaybackEvent::Stopped { steps } => {
                    self.current_visual_step = None;
                    self.status = Some((false, format!("stopped after {} steps", steps)));
                }
                PlaybackEvent::Failed(message) => {
                    self.current_visual_step = None;
                    self.status = Some((true, format!("playback failed: {}", message)));
                }
            }
        }
    }

    fn open_sink(&self) -> Result<Box<dyn ByteSink + Send>, String> {
        let port = match self.selected_port {
            Some(index) => Some(MidiPort::connect(index).map_err(|e| e.to_string())?),
            None => None,
        };
        let sink: Box<dyn ByteSink + Send> = match (port, self.monitor_enabled) {
            (Some(port), true) => Box::new(Tee {
                primary: port,
                secondary: self.monitor.sink(),
            }),
            (Some(port), false) => Box::new(port),
            (None, true) => Box::new(self.monitor.sink()),
            (None, false) => return Err("select a MIDI output or enable the monitor".to_string()),
        };
        Ok(sink)
    }

    #[allow(clippy::type_complexity)]
    fn prepare(
        &self,
    ) -> Result<(TempoClock, Channel, VelocityTable, Box<dyn ByteSink + Send>), String> {
        let clock = self.config.clock().map_err(|e| e.to_string())?;
        let channel = self.config.channel().map_err(|e| e.to_string())?;
        let velocities = self.config.velocity_table().map_err(|e| e.to_string())?;
        Ok((clock, channel, velocities, self.open_sink()?))
    }

    fn start_playback(&mut self) {
        match self.prepare() {
            Ok((clock, channel, velocities, sink)) => {
                self.status = None;
                self.playback_engine
                    .start(self.pattern.clone(), velocities, clock, sink, channel);
            }
            Err(message) => self.status = Some((true, message)),
        }
    }

    fn stop_playback(&mut self) {
        self.playback_engine.stop();
    }

    fn step_leds(&self, ui: &mut egui::Ui) {
        let beat = self.config.steps_per_beat.max(1) as usize;
        ui.horizontal(|ui| {
            ui.add_space(150.0);
            for step in 0..self.pattern.steps() {
                let lit = self.current_visual_step == Some(step);
                let color = if lit {
                    egui::Color32::from_rgb(100, 200, 100)
                } else if step % beat == 0 {
                    egui::Color32::from_rgb(80, 80, 80)
                } else {
                    egui::Color32::from_rgb(40, 40, 40)
                };
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(36.0, 10.0), egui::Sense::hover());
                ui.painter().circle_filled(rect.center(), 4.0, color);
            }
        });
    }

    fn lane_grid(&self, ui: &mut egui::Ui) {
        let velocities = self.config.velocities;
        for lane in self.pattern.lanes() {
            ui.horizontal(|ui| {
                let name = match lane.label() {
                    Some(label) => format!("{} {}", midi_note_name(lane.note()), label),
                    None => format!("{} ({})", midi_note_name(lane.note()), lane.note()),
                };
                ui.add_sized([146.0, 28.0], egui::Label::new(name));

                for (step, symbol) in lane.hits().iter().enumerate() {
                    let is_current = self.current_visual_step == Some(step);
                    let fill = match velocities.resolve(*symbol) {
                        _ if is_current => egui::Color32::from_rgb(100, 200, 100),
                        None => egui::Color32::from_rgb(50, 50, 70),
                        Some(0) => egui::Color32::from_rgb(40, 40, 40),
                        Some(velocity) => {
                            let shade = 80 + (velocity as u32 * 175 / 127) as u8;
                            egui::Color32::from_rgb(60, 60, shade)
                        }
                    };
                    let text = match symbol {
                        Symbol::Off => String::new(),
                        other => other.as_char().to_string(),
                    };
                    ui.add(
                        egui::Button::new(text)
                            .min_size(egui::vec2(32.0, 28.0))
                            .fill(fill),
                    );
                }
            });
        }
    }
}

impl eframe::App for DrumboxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();
        let is_playing = self.playback_engine.is_running();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("drumbox");
            ui.add_space(10.0);

            // MIDI Port Selection
            ui.add_enabled_ui(!is_playing, |ui| {
                ui.horizontal(|ui| {
                    ui.label("MIDI Output:");
                    egui::ComboBox::from_id_source("midi_port")
                        .selected_text(
                            self.selected_port
                                .and_then(|i| self.available_midi_ports.get(i))
                                .map(String::as_str)
                                .unwrap_or("None"),
                        )
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut self.selected_port, None, "None");
                            for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                                ui.selectable_value(&mut self.selected_port, Some(i), port_name);
                            }
                        });
                    if ui.button("⟳").on_hover_text("Rescan ports").clicked() {
                        self.available_midi_ports = MidiPort::available_ports();
                        self.selected_port = self
                            .selected_port
                            .filter(|i| *i < self.available_midi_ports.len());
                    }

                    ui.add_space(20.0);
                    ui.checkbox(&mut self.monitor_enabled, "Audio monitor");
                });
            });

            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                if is_playing {
                    if ui.button("⏸ Stop").clicked() {
                        self.stop_playback();
                    }
                } else if ui.button("▶ Play").clicked() {
                    self.start_playback();
                }

                ui.add_space(20.0);

                // tempo is fixed while playing
                ui.add_enabled_ui(!is_playing, |ui| {
                    ui.label("BPM:");
                    ui.add(egui::Slider::new(&mut self.config.bpm, 20.0..=400.0).step_by(1.0));
                });
                ui.label(format!("channel {}", self.config.channel));
            });

            ui.add_space(20.0);

            self.step_leds(ui);
            self.lane_grid(ui);

            // Info
            ui.separator();
            match &self.status {
                Some((true, message)) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, message);
                }
                Some((false, message)) => {
                    ui.label(message);
                }
                None if self.selected_port.is_none() && !self.monitor_enabled => {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        "⚠ No MIDI output selected and the monitor is off",
                    );
                }
                None => {}
            }
        });
    }
}
