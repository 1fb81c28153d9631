//! This module defines the `Command` enum and its associated methods for parsing
//! and handling user commands in the FAT32 recovery tool.
//!
//! The `Command` enum represents various commands that the user can input,
//! such as quitting the program, opening a disk image, selecting a partition,
//! reconstructing chains, or handling invalid or unknown commands.

/// Represents a user command in the FAT32 recovery tool.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Command to quit the program.
    Quit,
    /// Command to open a disk image, encapsulating the file path as a `String`.
    Open(String),
    /// Command to print the disk and volume layouts.
    Print,
    /// Select the partition to analyse (1-based, 0 for a bare volume).
    Partition(u8),
    /// Print the header summaries of the selected volume.
    Info,
    /// Reconstruct and list the chains of the selected volume.
    Chains,
    /// Export every chain into the given directory.
    Dump(String),
    /// Skip the strict BPB validation
    Skip,
    /// Command for an unknown input, encapsulating the raw input as a `String`.
    Unknown(String),
    /// Command for invalid input, encapsulating an error message as a `String`.
    Invalid(String),
    /// Command for an empty input.
    Empty,
}

impl Command {
    /// Parses a string into a `Command` instance.
    ///
    /// # Parameters
    /// - `s`: A string slice representing the user input.
    ///
    /// # Returns
    /// - `Command::Quit` if the input is "quit".
    /// - `Command::Open` with the file path if the input starts with "open" followed by a valid argument.
    /// - `Command::Print` if the input is "print".
    /// - `Command::Partition` if the input is "part" followed by a partition number.
    /// - `Command::Info` if the input is "info".
    /// - `Command::Chains` if the input is "chains".
    /// - `Command::Dump` with the directory if the input starts with "dump" followed by an argument.
    /// - `Command::Skip` if the input is "skip".
    /// - `Command::Unknown` if the input does not match any known command.
    /// - `Command::Invalid` if a command is missing or has an invalid argument.
    /// - `Command::Empty` if the input is empty or contains only whitespace.
    pub fn from_string(s: &str) -> Self {
        let mut parts = s.split_whitespace();
        match parts.next() {
            Some("quit") => Command::Quit,
            Some("open") => match parts.next() {
                Some(arg) => Command::Open(arg.to_string()),
                None => Command::Invalid(String::from(
                    "Missing arg: 'open' expects the path to a '.img' file.",
                )),
            },
            Some("print") => Command::Print,
            Some("part") => match parts.next() {
                Some(arg) => match arg.parse::<u8>() {
                    Ok(nb) => Command::Partition(nb),
                    Err(_) => Command::Invalid(String::from(
                        "Arg parsing error: 'part' expects an unsigned integer.",
                    )),
                },
                None => Command::Invalid(String::from(
                    "Missing arg: 'part' expects the partition number.",
                )),
            },
            Some("info") => Command::Info,
            Some("chains") => Command::Chains,
            Some("dump") => match parts.next() {
                Some(arg) => Command::Dump(arg.to_string()),
                None => Command::Invalid(String::from(
                    "Missing arg: 'dump' expects the output directory.",
                )),
            },
            Some("skip") => Command::Skip,
            Some(other) => Command::Unknown(other.to_string()),
            None => Command::Empty,
        }
    }
}
