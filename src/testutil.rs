//! Shared test helpers for fleet-rsm unit tests.

use crate::command::{
    AddFilament, AddPrintJob, AddPrinter, Command, CommandEnvelope, UpdateJobStatus,
};
use crate::storage::models::{FilamentType, JobStatus, Printer};

pub fn printer(id: &str) -> Printer {
    Printer {
        id: id.to_string(),
        company: "Prusa".to_string(),
        model: "MK4".to_string(),
    }
}

pub fn add_printer_cmd(id: &str) -> Command {
    let p = printer(id);
    Command::AddPrinter(AddPrinter {
        id: p.id,
        company: p.company,
        model: p.model,
    })
}

/// A fresh spool of `grams` PLA.
pub fn add_filament_cmd(id: &str, grams: i64) -> Command {
    Command::AddFilament(AddFilament {
        id: id.to_string(),
        filament_type: FilamentType::Pla,
        color: "black".to_string(),
        total_weight_grams: grams,
        remaining_weight_grams: None,
    })
}

pub fn add_job_cmd(id: &str, printer_id: &str, filament_id: &str, grams: i64) -> Command {
    Command::AddPrintJob(AddPrintJob {
        id: id.to_string(),
        printer_id: printer_id.to_string(),
        filament_id: filament_id.to_string(),
        file_path: format!("/jobs/{id}.gcode"),
        print_weight_grams: grams,
    })
}

pub fn set_status_cmd(id: &str, status: JobStatus) -> Command {
    Command::UpdateJobStatus(UpdateJobStatus {
        id: id.to_string(),
        new_status: status,
    })
}

pub fn envelope(request_id: &str, command: Command) -> CommandEnvelope {
    command
        .into_envelope(request_id)
        .expect("Failed to encode command")
}
