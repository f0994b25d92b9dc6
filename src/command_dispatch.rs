//! Purpose: Map the parsed CLI action onto toggler planning and execution.
//! Exports: `Action`, `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap; owns user-facing status lines.
//! Invariants: Privilege is requested only once a plan contains moves.
//! Invariants: `--status` and `--dry-run` never mutate and never prompt.
use std::path::Path;

use serde::Serialize;

use super::*;
use resolve_glib_patch::core::listing::FsListing;
use resolve_glib_patch::core::privilege::{self, Access};
use resolve_glib_patch::core::toggler::{ApplyPlan, Direction, MovePlan, PatchState, Toggler};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Action {
    Apply,
    Revert,
    Status { json: bool },
    Completions(Shell),
}

pub(super) fn dispatch_command(
    action: Action,
    dry_run: bool,
    config: &PatchConfig,
    console: Console,
) -> Result<RunOutcome, Error> {
    let listing = FsListing;
    let toggler = Toggler::new(config, &listing);
    match action {
        Action::Completions(shell) => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Action::Status { json } => {
            let state = toggler.inspect()?;
            if json {
                emit_status_json(config, &state)?;
            } else {
                emit_status_human(config, &state, console);
            }
            let exit_code = if state.is_consistent() {
                0
            } else {
                FAILURE_EXIT_CODE
            };
            Ok(RunOutcome::with_code(exit_code))
        }
        Action::Apply => {
            console.step(format!(
                "Disabling bundled glib libraries in {}",
                config.lib_dir().display()
            ));
            match toggler.plan_apply()? {
                ApplyPlan::AlreadyApplied { count } => {
                    console.success(format!(
                        "Patch already applied ({count} {} in {})",
                        libraries(count),
                        config.disabled_dir().display()
                    ));
                }
                ApplyPlan::Move(plan) => run_plan(&plan, dry_run, console)?,
            }
            Ok(RunOutcome::ok())
        }
        Action::Revert => {
            console.step(format!(
                "Restoring bundled glib libraries from {}",
                config.disabled_dir().display()
            ));
            let plan = toggler.plan_revert()?;
            run_plan(&plan, dry_run, console)?;
            Ok(RunOutcome::ok())
        }
    }
}

fn run_plan(plan: &MovePlan, dry_run: bool, console: Console) -> Result<(), Error> {
    if dry_run {
        if plan.create_dest {
            console.detail(format!("would create {}", plan.to.display()));
        }
        for (from, to) in plan.moves() {
            console.detail(format!("would move {} -> {}", from.display(), to.display()));
        }
        if plan.remove_source {
            console.detail(format!("would remove {}", plan.from.display()));
        }
        let count = plan.names.len();
        console.warn(format!("Dry run: {count} {} left in place", libraries(count)));
        return Ok(());
    }

    let mut dirs = vec![plan.from.as_path()];
    if !plan.create_dest {
        dirs.push(plan.to.as_path());
    }
    let grant = privilege::acquire(&dirs)?;
    if grant.access() == Access::Sudo {
        console.step("Using sudo for file operations");
    }
    let ops = grant.ops();
    let result = Toggler::execute(plan, ops.as_ref());
    grant.release();
    let moved = result?;

    match plan.direction {
        Direction::Apply => console.success(format!(
            "Moved {moved} {} into {}",
            libraries(moved),
            plan.to.display()
        )),
        Direction::Revert => console.success(format!(
            "Restored {moved} {} to {}",
            libraries(moved),
            plan.to.display()
        )),
    }
    Ok(())
}

fn libraries(count: usize) -> &'static str {
    if count == 1 { "library" } else { "libraries" }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    lib_dir: &'a Path,
    disabled_dir: &'a Path,
    #[serde(flatten)]
    state: &'a PatchState,
}

fn emit_status_json(config: &PatchConfig, state: &PatchState) -> Result<(), Error> {
    let report = StatusReport {
        lib_dir: config.lib_dir(),
        disabled_dir: config.disabled_dir(),
        state,
    };
    let json = serde_json::to_string(&report).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode status")
            .with_source(err)
    })?;
    println!("{json}");
    Ok(())
}

fn emit_status_human(config: &PatchConfig, state: &PatchState, console: Console) {
    let lib_dir = config.lib_dir().display();
    let disabled_dir = config.disabled_dir().display();
    match state {
        PatchState::Applied { count } => {
            console.success(format!(
                "applied ({count} {} in {disabled_dir})",
                libraries(*count)
            ))
        }
        PatchState::NotApplied { count } => {
            console.success(format!(
                "not applied ({count} {} in {lib_dir})",
                libraries(*count)
            ))
        }
        PatchState::NoLibraries => {
            console.warn(format!("no conflicting libraries in {lib_dir} or {disabled_dir}"))
        }
        PatchState::Inconsistent {
            in_lib_dir,
            in_disabled_dir,
        } => console.warn(format!(
            "inconsistent: {in_lib_dir} {} in {lib_dir}, {in_disabled_dir} in {disabled_dir}",
            libraries(*in_lib_dir)
        )),
        PatchState::Missing => console.warn(format!("library directory {lib_dir} not found")),
    }
}
