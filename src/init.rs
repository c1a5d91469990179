use crate::request::ApplyRequest;
use color_eyre::eyre::bail;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::Path;

fn sample_request() -> ApplyRequest {
    let mut subs = BTreeMap::new();
    subs.insert(
        "upstream.conf".to_string(),
        "upstream app { server 127.0.0.1:3000; }\n".to_string(),
    );

    ApplyRequest {
        path: "demo/nginx.conf".to_string(),
        content: "# managed by confapply\ninclude conf.d/*.conf;\n".to_string(),
        sub_dir: "demo/conf.d".to_string(),
        sub_mode: "direct".to_string(),
        subs,
        reload_cmd: String::new(),
        pid: String::new(),
    }
}

pub fn run(dir: &Path) -> color_eyre::Result<()> {
    let request_path = dir.join("apply.json");

    if request_path.exists() {
        if std::io::stdin().is_terminal() {
            cliclack::intro("confapply init")?;
            let overwrite: bool = cliclack::confirm("apply.json already exists. Overwrite?")
                .initial_value(false)
                .interact()?;
            if !overwrite {
                cliclack::outro_cancel("Aborted.")?;
                bail!("aborted");
            }
        } else {
            bail!("apply.json already exists");
        }
    }

    let body = serde_json::to_string_pretty(&sample_request())?;
    std::fs::write(&request_path, body + "\n")?;
    println!("Created {}", request_path.display());

    Ok(())
}
