use anyhow::Result;
use vegh_settings::PreferenceKey;

use super::App;
use crate::cli::ConfigCommand;

pub(super) fn config(app: &App, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Set { key, value } => {
            let key: PreferenceKey = key.parse()?;
            let mut prefs = app.store.load()?;
            prefs.set(key, &value);
            app.store.save(&prefs)?;
            println!("{key} = {}", prefs.display_value(key));
        }
        ConfigCommand::Show => {
            let prefs = app.store.load()?;
            println!("# {}", app.store.path().display());
            for key in PreferenceKey::ALL {
                println!("{key:<7} {}", prefs.display_value(key));
            }
        }
        ConfigCommand::Reset => {
            app.store.reset()?;
            println!("Preferences reset");
        }
    }
    Ok(())
}
