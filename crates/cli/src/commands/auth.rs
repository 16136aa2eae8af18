//! `kf auth` commands.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use kickforge_client::{AppState, ErrorKind};
use kickforge_client::services::{AuthService, OtpTimer};

use super::CommandError;

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(), CommandError> {
    let user = AuthService::new(state).login(email, password).await?;
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

pub async fn logout(state: &AppState) -> Result<(), CommandError> {
    AuthService::new(state).logout().await?;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(state: &AppState) -> Result<(), CommandError> {
    if !state.is_authenticated().await {
        println!("Not signed in.");
        return Ok(());
    }

    match AuthService::new(state).refresh_session().await? {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            if let Some(phone) = &user.phone {
                println!("Phone: {phone}");
            }
            if !user.verified {
                println!("Email not verified yet.");
            }
        }
        None => println!("Your session has expired. Please sign in again."),
    }
    Ok(())
}

pub async fn register(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), CommandError> {
    let message = AuthService::new(state).register(name, email, password).await?;
    println!("{message}");
    println!("Then run: kf auth verify -e {email}");
    Ok(())
}

/// Verify with a given code, or prompt for one while the code is valid.
pub async fn verify(state: &AppState, email: &str, otp: Option<&str>) -> Result<(), CommandError> {
    let auth = AuthService::new(state);
    let otp = match otp {
        Some(otp) => otp.to_owned(),
        None => prompt_for_code(state, email).await?,
    };

    let user = auth.verify_otp(email, &otp).await?;
    println!("Email verified. Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

/// Read a code from stdin. Once the code expires, an empty line or `resend`
/// asks for a new one and restarts the countdown.
async fn prompt_for_code(state: &AppState, email: &str) -> Result<String, CommandError> {
    let auth = AuthService::new(state);
    let mut timer = OtpTimer::start(state.config().otp_seconds);
    println!(
        "Enter the code sent to {email} (expires in {}), or `resend` for a new one:",
        timer.countdown().display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let mut updates = timer.subscribe();
        let line = if timer.can_resend() {
            next_line(&mut lines).await?
        } else {
            tokio::select! {
                line = next_line(&mut lines) => line?,
                _ = updates.wait_for(|countdown| countdown.can_resend()) => {
                    println!("The code has expired. Press Enter to get a new one.");
                    continue;
                }
            }
        };

        let Some(line) = line else {
            return Err(CommandError::Failed("No code entered.".to_owned()));
        };
        let input = line.trim();
        if !input.is_empty() && !input.eq_ignore_ascii_case("resend") {
            return Ok(input.to_owned());
        }
        if input.is_empty() && !timer.can_resend() {
            continue;
        }

        match auth.resend_code(&mut timer, email).await {
            Ok(()) => println!(
                "A new code is on its way (expires in {}).",
                timer.countdown().display()
            ),
            Err(e) if e.kind() == ErrorKind::Validation => println!("{}", e.user_message()),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn next_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>, CommandError> {
    lines.next_line().await.map_err(|source| CommandError::Io {
        path: "<stdin>".into(),
        source,
    })
}

pub async fn resend(state: &AppState, email: &str) -> Result<(), CommandError> {
    AuthService::new(state).resend_otp(email).await?;
    println!("A new code is on its way to {email}.");
    Ok(())
}

pub async fn forgot(state: &AppState, email: &str) -> Result<(), CommandError> {
    AuthService::new(state).forgot_password(email).await?;
    println!("If {email} has an account, a reset code is on its way.");
    println!("Then run: kf auth reset -e {email} -o <code> -p <new password>");
    Ok(())
}

pub async fn reset(
    state: &AppState,
    email: &str,
    otp: &str,
    password: &str,
) -> Result<(), CommandError> {
    AuthService::new(state)
        .reset_password(email, otp, password)
        .await?;
    println!("Password updated. You can sign in now.");
    Ok(())
}

