use clap::Parser;
use keyfall::{
    cli::{select_device, validate_device, Args},
    config::{Settings, DEFAULT_SHOW_DURATION_US},
    logging,
    midi::{list_devices, DefaultMidiEngine, DeviceInfo, MidiDeviceContext, MidiEngine},
    midi_file::MidiFile,
    stats::SavedStats,
    ui::{Presenter, ProgressPresenter},
    JudgeConfig, Session, SessionOptions,
};
use std::path::Path;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    initialize_logging();
    let args = Args::parse();
    let mut settings = load_settings();

    let (inputs, outputs) = list_devices();
    if args.device_list {
        list_available_devices(&inputs, &outputs);
        return;
    }

    for (name, devices) in [(&args.input, &inputs), (&args.output, &outputs)] {
        if let Some(device_name) = name {
            if let Err(error_msg) = validate_device(device_name, devices) {
                fail(&error_msg);
            }
        }
    }

    let (input, output) = if args.select_devices {
        (
            select_device("MIDI input", &inputs),
            select_device("MIDI output", &outputs),
        )
    } else {
        (
            args.input.clone().or_else(|| settings.input_device.clone()),
            args.output.clone().or_else(|| settings.output_device.clone()),
        )
    };

    let path = match args.file.clone().or_else(|| settings.last_file.clone()) {
        Some(path) => path,
        None => fail("No MIDI file given and none played before"),
    };
    let file = load_file(&path);

    let devices = open_devices(input.as_deref(), output.as_deref());

    settings.last_file = Some(path);
    settings.input_device = input;
    settings.output_device = output;
    if let Some(speed) = args.speed {
        settings.speed = speed;
    }
    if let Err(e) = settings.save() {
        log::warn!("{}", e);
    }

    let options = SessionOptions {
        tracks: args.track_settings(file.tracks().len()),
        speed: settings.speed,
        lead_in: settings.lead_in_us(),
        lead_out: settings.lead_out_us(),
        judge: JudgeConfig::default(),
    };
    if args.play_tracks.is_empty() {
        println!("No track selected with --play-track; listening only.");
    }

    let mut session = Session::new(file, devices, options);
    run_application_loop(&mut session, settings.refresh_rate);
}

fn initialize_logging() {
    match logging::init_logger() {
        Ok(()) => log::info!("Application starting"),
        Err(e) => {
            logging::init_stderr_logger();
            log::warn!("File logging unavailable ({}), logging to stderr", e);
        }
    }
}

fn load_settings() -> Settings {
    Settings::load().unwrap_or_else(|e| {
        log::warn!("{}; using default settings", e);
        Settings::default()
    })
}

fn list_available_devices(inputs: &[DeviceInfo], outputs: &[DeviceInfo]) {
    println!("Available MIDI inputs:");
    for device in inputs {
        println!("  - {}", device.name);
    }
    println!("Available MIDI outputs:");
    for device in outputs {
        println!("  - {}", device.name);
    }
}

fn load_file(path: &Path) -> MidiFile {
    match MidiFile::load(path) {
        Ok(file) => {
            println!("Loaded {}", file.name());
            file
        }
        Err(e) => fail(&format!("Error loading MIDI file: {}", e)),
    }
}

fn open_devices(
    input: Option<&str>,
    output: Option<&str>,
) -> MidiDeviceContext<DefaultMidiEngine> {
    let engine = match DefaultMidiEngine::new() {
        Ok(engine) => engine,
        Err(e) => {
            log::warn!("Error initialising MIDI: {}", e);
            eprintln!("MIDI unavailable ({}), playing without devices", e);
            return MidiDeviceContext::without_engine();
        }
    };

    let mut devices = MidiDeviceContext::new(engine);
    if let Some(name) = output {
        if !devices.open_output_named(name) {
            eprintln!("Could not open output '{}', playing silently", name);
        }
    }
    if let Some(name) = input {
        if !devices.open_input_named(name) {
            eprintln!("Could not open input '{}', input disabled", name);
        }
    }
    devices
}

fn run_application_loop<E: MidiEngine>(session: &mut Session<E>, refresh_rate: u32) {
    let frame = Duration::from_secs_f64(1.0 / f64::from(refresh_rate.max(1)));
    let mut presenter = ProgressPresenter::new(session.file().name());
    let mut last = Instant::now();

    log::info!("Playing at {} frames per second", refresh_rate);
    loop {
        let now = Instant::now();
        let elapsed = now.duration_since(last).as_micros() as i64;
        last = now;

        if session.poll_reconnect(elapsed) {
            log::info!("MIDI device is back");
        }
        session.update(elapsed);
        presenter.present(&session.view(DEFAULT_SHOW_DURATION_US));

        if let Some(result) = session.take_result() {
            presenter.finish(&result);
            if let Some(path) = SavedStats::default_path() {
                if let Err(e) = SavedStats::new(path).append(result) {
                    log::error!("{}", e);
                }
            }
            break;
        }

        thread::sleep(frame.saturating_sub(now.elapsed()));
    }
}

fn fail(error_msg: &str) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    process::exit(1);
}
