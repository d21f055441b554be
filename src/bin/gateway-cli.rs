use clap::{Parser, Subcommand};

use lead_gateway::client::chat::GREETING;
use lead_gateway::client::{ChatSessionController, Field, FormState, FormSubmissionController, HttpGateway};
use lead_gateway::protocol::Role;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Drive the chat and contact flows against a running lead gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// Hold one chat session, sending each text as a turn
    Chat {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Submit the lead-capture form once
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let gateway = HttpGateway::new(&cli.url);

    match cli.command {
        Commands::Health => {
            let status = gateway.health().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Chat { texts } => {
            let mut chat = ChatSessionController::new(gateway);
            println!("assistant> {}", GREETING);

            for text in texts {
                println!("you> {}", text);
                chat.send_text(&text).await;

                if let Some(reply) = chat.session().messages().last().filter(|m| m.role == Role::Assistant) {
                    println!("assistant> {}", reply.content);
                }
            }

            if let Some(failure) = chat.session().last_error() {
                eprintln!("Last turn failed: {:?}", failure);
            }
        }
        Commands::Contact {
            name,
            email,
            service,
            company,
            budget,
            message,
        } => {
            let mut form = FormSubmissionController::new(gateway);
            form.set_field(Field::Name, &name);
            form.set_field(Field::Email, &email);
            form.set_field(Field::Service, &service);
            form.set_field(Field::Company, company.as_deref().unwrap_or_default());
            form.set_field(Field::Budget, budget.as_deref().unwrap_or_default());
            form.set_field(Field::Message, message.as_deref().unwrap_or_default());

            match form.submit().await {
                FormState::Invalid { errors } => {
                    eprintln!("Error: the form is invalid");
                    for (field, error) in errors {
                        eprintln!("  {:?}: {}", field, error);
                    }
                }
                state => match state.notice() {
                    Some(notice) => println!("{}", notice),
                    None => println!("{:?}", state),
                },
            }
        }
    }

    Ok(())
}
