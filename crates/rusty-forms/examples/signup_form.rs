// A signup form parsed from a request and validated asynchronously.
//
// Run with: cargo run -p rusty-forms --example signup_form

use rusty_forms::validators::{self, FileValidators};
use rusty_forms::{define_model, lifecycle, Config, EventArgs, FormModel, FormRequest, Outcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load_default()?;
    let files = FileValidators::from_config(&config);

    let signup = define_model("signupForm")
        .fields(["email_address", "password", "password_confirm", "avatar"])
        .label("password_confirm", "Password (again)")
        .validators("email_address", [validators::required(), validators::email()])
        .validators(
            "password",
            [validators::required(), validators::min_length(8)],
        )
        .validator("password_confirm", validators::match_property("password"))
        .validators("avatar", [files.max_size("2M")?, files.mime_types(["image/*"])])
        .file_mappings(config.file_mappings())
        .on(lifecycle::AFTER_VALIDATE, |model: &mut FormModel, args: &mut EventArgs| {
            if let Some((valid, errors)) = args.validation() {
                tracing::info!(model = %model.name(), valid, errors = errors.count(), "validated");
            }
            Outcome::done()
        })
        .build()?;

    let request = FormRequest::from_json(serde_json::json!({
        "body": {
            "signupForm_email_address": "ross@example",
            "signupForm_password": "hunter2",
            "signupForm_password_confirm": "hunter3"
        },
        "files": {
            "signupForm_avatar": {"name": "me.gif", "type": "image/gif", "size": 4096}
        }
    }))?;

    let mut form = signup.create();
    form.parse_request(request).await?;

    if !form.validate().await? {
        for field in form.fields() {
            for message in form.get_errors(field)? {
                println!("{}: {message}", form.get_field_identifier(field)?);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(form.errors())?);
    Ok(())
}
