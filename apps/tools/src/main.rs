use anyhow::Result;
use chrono::NaiveDate;
use clap::{builder::BoolishValueParser, Parser, Subcommand};
use shared::{
    domain::{BloodGroup, DonorId, DonorPatch, Gender, NewDonor},
    error::DomainError,
};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/directory.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        name: String,
        blood_group: BloodGroup,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        gender: Gender,
        #[arg(long)]
        age: u8,
        #[arg(long)]
        location: String,
        #[arg(long)]
        emergency_contact: String,
        #[arg(long)]
        address: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        last_donation_date: Option<NaiveDate>,
        #[arg(long)]
        medical_conditions: Option<String>,
    },
    SetAvailability {
        donor_id: i64,
        #[arg(value_parser = BoolishValueParser::new())]
        available: bool,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Register {
            name,
            blood_group,
            email,
            phone,
            gender,
            age,
            location,
            emergency_contact,
            address,
            last_donation_date,
            medical_conditions,
        } => {
            let donor = storage
                .register_donor(&NewDonor {
                    name,
                    email,
                    phone,
                    blood_group,
                    gender,
                    age,
                    location,
                    address,
                    last_donation_date,
                    medical_conditions,
                    emergency_contact,
                })
                .await?;
            println!("registered donor_id={} ({})", donor.id, donor.blood_group);
        }
        Command::SetAvailability {
            donor_id,
            available,
        } => {
            let donor = storage
                .update_donor(DonorId(donor_id), &DonorPatch::availability(available))
                .await?
                .ok_or(DomainError::DonorNotFound(donor_id))?;
            println!("donor_id={} is_available={}", donor.id, donor.is_available);
        }
        Command::List { json } => {
            let donors = storage.list_donors().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&donors)?);
            } else {
                for donor in donors {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        donor.id,
                        donor.blood_group,
                        donor.name,
                        donor.location,
                        if donor.is_available { "available" } else { "unavailable" }
                    );
                }
            }
        }
    }

    Ok(())
}
