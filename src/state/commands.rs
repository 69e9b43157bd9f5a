//! `/lpadmin` and `/lp` command parsing and execution.
//!
//! Parsing is pure and returns a typed command; execution runs it against
//! the service and reports the result to the sender as chat messages.

use super::error::{AdminError, CommandError};
use super::host::Host;
use super::service::{PillarService, WaitAreaStep};
use super::tasks::Scheduler;
use tracing::info;

const ADMIN_USAGE: &[&str] = &[
    "§e===== Lucky Pillar Admin =====",
    "§6/lpadmin reload §f- Reload the configuration",
    "§6/lpadmin init §f- Reset the configuration to defaults",
    "§6/lpadmin add <name> §f- Create a session at your position",
    "§6/lpadmin remove <session> §f- Delete a session",
    "§6/lpadmin setcenter <session> §f- Set the center to your position",
    "§6/lpadmin addpillar <session> §f- Add a pillar at your position",
    "§6/lpadmin removepillar <session> <pillar> §f- Delete a pillar",
    "§6/lpadmin setpillar <session> <pillar> §f- Move a pillar to your position",
    "§6/lpadmin setwaitarea <session> §f- Set a wait-area corner (run twice)",
    "§6/lpadmin start <session> §f- Start a round",
    "§6/lpadmin stop <session> [message] §f- Force-stop a round",
];

/// A parsed `/lpadmin` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Reload,
    Init,
    Add { name: String },
    Remove { session_id: String },
    SetCenter { session_id: String },
    AddPillar { session_id: String },
    RemovePillar { session_id: String, pillar_id: String },
    SetPillar { session_id: String, pillar_id: String },
    SetWaitArea { session_id: String },
    Start { session_id: String },
    Stop { session_id: String, message: Option<String> },
}

fn arg(args: &[&str], index: usize, usage: &'static str) -> Result<String, CommandError> {
    args.get(index)
        .map(|s| s.to_string())
        .ok_or(CommandError::Usage(usage))
}

impl AdminCommand {
    pub fn parse(args: &[&str]) -> Result<Self, CommandError> {
        let Some(sub) = args.first() else {
            return Ok(Self::Help);
        };

        let command = match sub.to_ascii_lowercase().as_str() {
            "help" => Self::Help,
            "reload" => Self::Reload,
            "init" => Self::Init,
            "add" => {
                if args.len() < 2 {
                    return Err(CommandError::Usage("/lpadmin add <name>"));
                }
                Self::Add {
                    name: args[1..].join(" "),
                }
            }
            "remove" => Self::Remove {
                session_id: arg(args, 1, "/lpadmin remove <session>")?,
            },
            "setcenter" => Self::SetCenter {
                session_id: arg(args, 1, "/lpadmin setcenter <session>")?,
            },
            "addpillar" => Self::AddPillar {
                session_id: arg(args, 1, "/lpadmin addpillar <session>")?,
            },
            "removepillar" => Self::RemovePillar {
                session_id: arg(args, 1, "/lpadmin removepillar <session> <pillar>")?,
                pillar_id: arg(args, 2, "/lpadmin removepillar <session> <pillar>")?,
            },
            "setpillar" => Self::SetPillar {
                session_id: arg(args, 1, "/lpadmin setpillar <session> <pillar>")?,
                pillar_id: arg(args, 2, "/lpadmin setpillar <session> <pillar>")?,
            },
            "setwaitarea" => Self::SetWaitArea {
                session_id: arg(args, 1, "/lpadmin setwaitarea <session>")?,
            },
            "start" => Self::Start {
                session_id: arg(args, 1, "/lpadmin start <session>")?,
            },
            "stop" => Self::Stop {
                session_id: arg(args, 1, "/lpadmin stop <session> [message]")?,
                message: (args.len() > 2).then(|| args[2..].join(" ")),
            },
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// A parsed `/lp` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// List sessions
    Info,
    Leave,
    Teleport { session_id: String },
}

impl PlayerCommand {
    pub fn parse(args: &[&str]) -> Result<Self, CommandError> {
        let Some(sub) = args.first() else {
            return Ok(Self::Info);
        };
        match sub.to_ascii_lowercase().as_str() {
            "leave" => Ok(Self::Leave),
            "tp" => Ok(Self::Teleport {
                session_id: arg(args, 1, "/lp tp <session>")?,
            }),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

impl<H: Host, S: Scheduler> PillarService<H, S> {
    /// Entry point for both commands. Returns false for labels it does not own.
    pub fn handle_command(&mut self, sender: &str, label: &str, args: &[&str]) -> bool {
        match label {
            "lpadmin" => match AdminCommand::parse(args) {
                Ok(command) => self.execute_admin(sender, command),
                Err(e) => self.host.send_message(sender, &format!("§c{}", e)),
            },
            "lp" => match PlayerCommand::parse(args) {
                Ok(command) => self.execute_player(sender, command),
                Err(e) => self.host.send_message(sender, &format!("§c{}", e)),
            },
            _ => return false,
        }
        true
    }

    pub fn execute_admin(&mut self, sender: &str, command: AdminCommand) {
        info!(sender, command = ?command, "Admin command");
        match self.run_admin(sender, command) {
            Ok(lines) => {
                for line in lines {
                    self.host.send_message(sender, &line);
                }
            }
            Err(e) => self.host.send_message(sender, &format!("§c{}", e)),
        }
    }

    fn run_admin(&mut self, sender: &str, command: AdminCommand) -> Result<Vec<String>, AdminError> {
        let reply: Vec<String> = match command {
            AdminCommand::Help => ADMIN_USAGE.iter().map(|l| l.to_string()).collect(),
            AdminCommand::Reload => {
                self.reload_config();
                vec!["§aConfiguration reloaded.".to_string()]
            }
            AdminCommand::Init => {
                self.reset_config();
                vec!["§aConfiguration reset to defaults.".to_string()]
            }
            AdminCommand::Add { name } => {
                let session_id = self.add_session(sender, &name)?;
                vec![format!("§aCreated session {} ({}).", session_id, name)]
            }
            AdminCommand::Remove { session_id } => {
                self.remove_session(&session_id)?;
                vec![format!("§aRemoved session {}.", session_id)]
            }
            AdminCommand::SetCenter { session_id } => {
                let pos = self.set_center(sender, &session_id)?;
                vec![format!("§aCenter of session {} set to {}.", session_id, pos)]
            }
            AdminCommand::AddPillar { session_id } => {
                let pillar_id = self.add_pillar(sender, &session_id)?;
                vec![format!("§aAdded pillar {} to session {}.", pillar_id, session_id)]
            }
            AdminCommand::RemovePillar {
                session_id,
                pillar_id,
            } => {
                self.remove_pillar(&session_id, &pillar_id)?;
                vec![format!("§aRemoved pillar {} from session {}.", pillar_id, session_id)]
            }
            AdminCommand::SetPillar {
                session_id,
                pillar_id,
            } => {
                let pos = self.set_pillar(sender, &session_id, &pillar_id)?;
                vec![format!("§aPillar {} moved to {}.", pillar_id, pos)]
            }
            AdminCommand::SetWaitArea { session_id } => {
                match self.set_wait_area(sender, &session_id)? {
                    WaitAreaStep::FirstCorner(pos) => vec![
                        format!("§aFirst corner set to {}.", pos),
                        "§eRun the command again at the opposite corner.".to_string(),
                    ],
                    WaitAreaStep::Completed(area) => {
                        vec![format!("§aWait area of session {} set: {}.", session_id, area)]
                    }
                }
            }
            AdminCommand::Start { session_id } => {
                self.start_round(&session_id)?;
                vec![format!("§aStarting the round in session {}.", session_id)]
            }
            AdminCommand::Stop {
                session_id,
                message,
            } => {
                if !self.config.sessions.contains_key(&session_id) {
                    return Err(AdminError::UnknownSession(session_id));
                }
                let message = message.unwrap_or_else(|| "§cThe round was stopped by an admin".to_string());
                match self.stop_round(&session_id, &message) {
                    Some(_) => vec![format!("§aStopped session {}.", session_id)],
                    None => vec![format!("§eSession {} has nothing to stop.", session_id)],
                }
            }
        };
        Ok(reply)
    }

    pub fn execute_player(&mut self, sender: &str, command: PlayerCommand) {
        match command {
            PlayerCommand::Info => self.describe_sessions(sender),
            PlayerCommand::Leave => {
                self.leave(sender, false);
            }
            PlayerCommand::Teleport { session_id } => {
                if let Err(e) = self.teleport_to_center(sender, &session_id) {
                    self.host.send_message(sender, &format!("§c{}", e));
                }
            }
        }
    }
}
