//! Executable that loads a movie against a target library and replays it to completion,
//! exercising the timeline end to end outside of any editor UI.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

use std::{collections::HashMap, path::Path, process, sync::Arc};

use clap::{App, Arg, ArgMatches};
use timeline_data_path::{GlobalDataPath, MemoryLayout, MemoryLayoutImpl};
use timeline_edits::EditLog;
use timeline_formats::{load_m64, load_wafi, replay_m64, replay_wafi, M64Paths, WafiEntry};
use timeline_layout::BinaryLayout;
use timeline_memory::BinaryMemory;

use crate::error::CliError;

mod error;
mod logging;

fn main() {
    if let Err(error) = run() {
        logging::log_fatal_error(&error);
        process::exit(1);
    }
}

fn build_cli() -> App<'static, 'static> {
    App::new("timeline_cli")
        .about("Loads a movie against a target library and replays it to completion")
        .arg(
            Arg::with_name("library")
                .long("library")
                .value_name("FILE")
                .help("path to the target dynamic library")
                .required(true),
        )
        .arg(
            Arg::with_name("init")
                .long("init")
                .value_name("SYMBOL")
                .help("name of the library's init function")
                .default_value("sm64_init"),
        )
        .arg(
            Arg::with_name("update")
                .long("update")
                .value_name("SYMBOL")
                .help("name of the library's per-frame update function")
                .default_value("sm64_update"),
        )
        .arg(
            Arg::with_name("movie")
                .long("movie")
                .value_name("FILE")
                .help("path to a .m64 or .wafi movie to replay")
                .required(true),
        )
        .arg(
            Arg::with_name("backup-slots")
                .long("backup-slots")
                .value_name("N")
                .help("number of backup slots the timeline may allocate")
                .default_value("16"),
        )
}

fn run() -> Result<(), CliError> {
    logging::init_logging()?;

    let matches = build_cli().get_matches();
    let library_path = matches.value_of("library").expect("required");
    let init_symbol = matches.value_of("init").expect("has default");
    let update_symbol = matches.value_of("update").expect("has default");
    let movie_path = matches.value_of("movie").expect("required");
    let backup_slots = parse_backup_slots(&matches)?;

    log::info!("loading {}", library_path);
    let (memory, base_slot) = unsafe { BinaryMemory::load(library_path, init_symbol, update_symbol) }
        .map_err(CliError::from)
        .map_err(|error| error.context(format!("loading library {}", library_path)))?;

    let binary_layout = BinaryLayout::read(library_path)
        .map_err(CliError::from)
        .map_err(|error| error.context(format!("reading debug info from {}", library_path)))?;

    let memory = Arc::new(memory);
    let layout = MemoryLayoutImpl::new(Arc::new(binary_layout.data_layout), Arc::clone(&memory));

    let input_paths = M64Paths {
        buttons: compile_path(&layout, "gControllerPads[0].button")?,
        stick_x: compile_path(&layout, "gControllerPads[0].stick_x")?,
        stick_y: compile_path(&layout, "gControllerPads[0].stick_y")?,
    };

    let mut edit_log = EditLog::new();
    let num_frames = load_movie(movie_path, &layout, &input_paths, &mut edit_log)?;

    drop(layout);
    let memory = Arc::try_unwrap(memory)
        .unwrap_or_else(|_| panic!("data path compilation left a dangling memory reference"));

    let timeline = timeline_core::Timeline::new(memory, base_slot, edit_log, backup_slots);

    log::info!("replaying {} frames", num_frames);
    if num_frames > 0 {
        let last_frame = num_frames - 1;
        timeline
            .get(last_frame, &input_paths.buttons)
            .map_err(CliError::from)
            .map_err(|error| error.context(format!("advancing to frame {}", last_frame)))?;
    }

    println!(
        "reached frame {} ({} advances, {} copies, {} loaded frames)",
        num_frames,
        timeline.num_advances(),
        timeline.num_copies(),
        timeline.loaded_frames().len(),
    );

    Ok(())
}

fn parse_backup_slots(matches: &ArgMatches<'_>) -> Result<usize, CliError> {
    matches
        .value_of("backup-slots")
        .expect("has default")
        .parse()
        .map_err(|_| CliError::Io("--backup-slots must be a non-negative integer".to_string()))
}

fn compile_path(layout: &impl MemoryLayout, source: &str) -> Result<GlobalDataPath, CliError> {
    let path = layout
        .global_path(source)
        .map_err(CliError::from)
        .map_err(|error| error.context(format!("compiling data path {}", source)))?;
    Ok((*path).clone())
}

/// Load and replay a movie file, dispatching on its extension, and return its frame count.
fn load_movie<M: timeline_memory::GameMemory>(
    movie_path: &str,
    layout: &impl MemoryLayout,
    input_paths: &M64Paths,
    edit_log: &mut EditLog<M>,
) -> Result<u32, CliError> {
    let extension = Path::new(movie_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "m64" => {
            let (metadata, inputs) = load_m64(movie_path)
                .map_err(CliError::from)
                .map_err(|error| error.context(format!("loading {}", movie_path)))?;
            log::info!("loaded {} ({} rerecords)", movie_path, metadata.rerecords());
            replay_m64(&inputs, input_paths, edit_log);
            Ok(inputs.len() as u32)
        }
        "wafi" | "json" => {
            let (metadata, entries) = load_wafi(movie_path)
                .map_err(CliError::from)
                .map_err(|error| error.context(format!("loading {}", movie_path)))?;
            log::info!("loaded {} ({})", movie_path, metadata.title);

            let variable_paths = compile_wafi_variable_paths(layout, &entries)?;
            replay_wafi(&entries, &variable_paths, input_paths, edit_log)
                .map_err(CliError::from)
                .map_err(|error| error.context(format!("replaying {}", movie_path)))?;

            let num_frames = entries
                .iter()
                .filter(|entry| matches!(entry, WafiEntry::FrameInput { .. }))
                .count() as u32;
            Ok(num_frames)
        }
        _ => Err(CliError::UnknownMovieFormat(movie_path.to_string())),
    }
}

fn compile_wafi_variable_paths(
    layout: &impl MemoryLayout,
    entries: &[WafiEntry],
) -> Result<HashMap<String, GlobalDataPath>, CliError> {
    let mut paths = HashMap::new();
    for entry in entries {
        if let WafiEntry::VariableEdit { variable, .. } = entry {
            if !paths.contains_key(variable) {
                paths.insert(variable.clone(), compile_path(layout, variable)?);
            }
        }
    }
    Ok(paths)
}
