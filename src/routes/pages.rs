//! Static result pages for the OAuth redirect.

use crate::services::authorization::AuthorizationOutcome;

fn page(title: &str, heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Launch Library Bot - {title}</title>
  <link href="https://fonts.googleapis.com/css?family=Sunflower:300" rel="stylesheet">
</head>
<body style="font-family: 'Sunflower', sans-serif;">
  <h1>{heading}</h1>
  {body}
</body>
</html>
"#
    )
}

pub fn authorization_failure(reason: &str) -> String {
    page(
        "Authorization Failure",
        "Error",
        &format!(
            "Unable to grant access: {}",
            html_escape::encode_text(reason)
        ),
    )
}

pub fn bot_install_success() -> String {
    page(
        "Application Installation Success",
        "Success",
        "Launch Library Bot has been successfully installed.  You may now close this tab and return to Slack.",
    )
}

pub fn reminder_access_success() -> String {
    page(
        "Authorization Success",
        "Success",
        "Launch Library Bot can now set reminders for you.  You may close this tab and attempt to set a reminder for a launch in Slack.",
    )
}

pub fn render(outcome: &AuthorizationOutcome) -> String {
    match outcome {
        AuthorizationOutcome::Failure { reason } => authorization_failure(reason),
        AuthorizationOutcome::BotInstalled => bot_install_success(),
        AuthorizationOutcome::UserGranted => reminder_access_success(),
    }
}
