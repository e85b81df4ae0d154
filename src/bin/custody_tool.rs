use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use luggage_custody::{
    Custody, CustodyConfig, IntakeRequest, ItemPatch, NewHotel, NewStoreroom, Role,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "custody-tool")]
#[command(about = "Operator tooling for the luggage custody engine")]
struct Cli {
    /// Snapshot file holding the custody state
    #[arg(long, default_value = "custody-state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    HotelAdd {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    StoreroomAdd {
        #[arg(long)]
        hotel: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        location: String,
        /// 0 means unlimited
        #[arg(long, default_value_t = 0)]
        capacity: u32,
        #[arg(long)]
        inactive: bool,
    },
    StoreroomToggle {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        active: bool,
    },
    UserAdd {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        hotel: i64,
    },
    Intake {
        #[arg(long)]
        guest: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        photo: Vec<String>,
        #[arg(long)]
        storeroom: i64,
        #[arg(long)]
        staff: String,
        #[arg(long)]
        qr_url: Option<String>,
    },
    Lookup {
        #[arg(long)]
        code: String,
    },
    Retrieve {
        #[arg(long)]
        code: String,
        #[arg(long)]
        staff: String,
    },
    Transfer {
        #[arg(long)]
        luggage: i64,
        #[arg(long)]
        to: i64,
        #[arg(long)]
        operator: String,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        guest: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
        /// Replaces the photo list, the first one is the primary photo
        #[arg(long)]
        photo: Vec<String>,
        #[arg(long, conflicts_with = "photo")]
        clear_photos: bool,
        #[arg(long)]
        storeroom: Option<i64>,
        #[arg(long, default_value = "")]
        operator: String,
    },
    ChangeCode {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        operator: String,
    },
    History {
        #[arg(long)]
        hotel: i64,
        #[arg(long)]
        guest: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Audits {
        #[arg(long)]
        hotel: i64,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Lookup { .. } | Command::History { .. } | Command::Audits { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = CustodyConfig::from_env()?;
    let custody = Custody::open(&cli.state, config)
        .with_context(|| format!("Failed to open custody state '{}'", cli.state.display()))?;

    let save = cli.command.mutates();
    run(&custody, cli.command).await?;

    if save {
        custody
            .save(&cli.state)
            .await
            .with_context(|| format!("Failed to save custody state '{}'", cli.state.display()))?;
    }
    Ok(())
}

async fn run(custody: &Custody, command: Command) -> Result<()> {
    let engine = custody.engine();
    let admin = custody.admin();

    match command {
        Command::HotelAdd {
            name,
            address,
            phone,
        } => {
            let hotel = admin
                .create_hotel(NewHotel {
                    name,
                    address,
                    phone,
                    active: true,
                })
                .await?;
            print_json(&hotel)
        }
        Command::StoreroomAdd {
            hotel,
            name,
            location,
            capacity,
            inactive,
        } => {
            let room = admin
                .create_storeroom(NewStoreroom {
                    hotel_id: hotel,
                    name,
                    location,
                    capacity,
                    active: !inactive,
                })
                .await?;
            print_json(&room)
        }
        Command::StoreroomToggle { id, active } => {
            print_json(&admin.set_storeroom_active(id, active).await?)
        }
        Command::UserAdd {
            username,
            password,
            role,
            hotel,
        } => {
            let user = admin
                .create_staff(&username, &password, role, Some(hotel))
                .await?;
            print_json(&serde_json::json!({
                "username": user.username(),
                "role": user.role(),
                "hotel_id": user.hotel_id(),
            }))
        }
        Command::Intake {
            guest,
            phone,
            email,
            description,
            quantity,
            notes,
            photo,
            storeroom,
            staff,
            qr_url,
        } => {
            let item = engine
                .create(IntakeRequest {
                    guest_name: guest,
                    contact_phone: phone,
                    contact_email: email,
                    description,
                    quantity,
                    notes,
                    photos: photo,
                    storeroom_id: storeroom,
                    staff_username: staff,
                    qr_url,
                })
                .await?;
            print_json(&item)
        }
        Command::Lookup { code } => print_json(&engine.find_by_code(&code).await?),
        Command::Retrieve { code, staff } => print_json(&engine.retrieve(&code, &staff).await?),
        Command::Transfer {
            luggage,
            to,
            operator,
        } => print_json(&engine.migrate(luggage, to, &operator).await?),
        Command::Update {
            id,
            guest,
            phone,
            email,
            description,
            quantity,
            notes,
            photo,
            clear_photos,
            storeroom,
            operator,
        } => {
            let patch = ItemPatch {
                guest_name: guest,
                contact_phone: phone,
                contact_email: email,
                description,
                quantity,
                notes,
                photos: photo_patch(photo, clear_photos),
                storeroom_id: storeroom,
            };
            print_json(&engine.update(id, patch, &operator).await?)
        }
        Command::ChangeCode { id, code, operator } => {
            print_json(&engine.change_code(id, &code, &operator).await?)
        }
        Command::History { hotel, guest, phone } => print_json(
            &engine
                .history_by_hotel(hotel, guest.as_deref(), phone.as_deref())
                .await?,
        ),
        Command::Audits { hotel } => print_json(&engine.update_audits(hotel).await?),
    }
}

/// `--photo` values replace the list and `--clear-photos` empties it. Neither
/// leaves the photos untouched.
fn photo_patch(photos: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if photos.is_empty() {
        None
    } else {
        Some(photos)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("luggage_custody=info,custody_tool=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_photos(args: &[&str]) -> Option<Vec<String>> {
        let cli = Cli::try_parse_from(["custody-tool", "update", "--id", "1"].iter().chain(args))
            .unwrap();
        match cli.command {
            Command::Update {
                photo,
                clear_photos,
                ..
            } => photo_patch(photo, clear_photos),
            _ => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn update_accepts_repeated_photos() {
        assert_eq!(
            update_photos(&["--photo", "front.jpg", "--photo", "tag.jpg"]),
            Some(vec!["front.jpg".to_string(), "tag.jpg".to_string()])
        );
        assert_eq!(update_photos(&["--clear-photos"]), Some(Vec::new()));
        assert_eq!(update_photos(&["--notes", "fragile"]), None);
    }

    #[test]
    fn photos_and_clear_conflict() {
        let parsed = Cli::try_parse_from([
            "custody-tool",
            "update",
            "--id",
            "1",
            "--photo",
            "a.jpg",
            "--clear-photos",
        ]);
        assert!(parsed.is_err());
    }
}
