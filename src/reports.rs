use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::manager::RecordManager;
use crate::types::{GameType, ProbabilityAnalysis};

pub fn report_filename(game: GameType) -> String {
    format!("lotto_report_{}.html", game.as_str())
}

fn number_chips(game: GameType, numbers: &[u8], class: &str) -> String {
    let def = catalog::definition(game);
    numbers
        .iter()
        .map(|n| format!(r#"<span class="chip {}">{}</span>"#, class, def.format_number(*n)))
        .collect::<Vec<_>>()
        .join("\n                ")
}

pub fn generate_html_report(analysis: &ProbabilityAnalysis) -> String {
    let def = catalog::definition(analysis.game_type);
    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Análisis de frecuencia - {name}</title>
    <style>
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, sans-serif;
            margin: 0;
            padding: 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
        }}
        .container {{
            max-width: 1000px;
            margin: 0 auto;
            background: white;
            border-radius: 15px;
            box-shadow: 0 20px 40px rgba(0,0,0,0.1);
            overflow: hidden;
        }}
        .header {{
            background: linear-gradient(135deg, #ff6b6b, #feca57);
            color: white;
            padding: 30px;
            text-align: center;
        }}
        .content {{ padding: 30px; }}
        .chip {{
            display: inline-block;
            min-width: 2.5em;
            padding: 8px;
            margin: 4px;
            border-radius: 50%;
            text-align: center;
            font-weight: 700;
        }}
        .hot {{ background: #ff6b6b; color: white; }}
        .cold {{ background: #48dbfb; color: white; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 6px 10px; border-bottom: 1px solid #e2e8f0; text-align: right; }}
        .footer {{ padding: 20px; text-align: center; color: #718096; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{name}</h1>
            <div class="date">{description}</div>
            <div class="date">Combinaciones activas: {total}</div>
        </div>
        <div class="content">
"#,
        name = def.display_name,
        description = def.description,
        total = analysis.total_generations,
    ));

    html.push_str(&format!(
        r#"            <h2>🔥 Números calientes</h2>
            <div>
                {}
            </div>
            <h2>❄️ Números fríos</h2>
            <div>
                {}
            </div>
"#,
        number_chips(analysis.game_type, &analysis.hot_numbers, "hot"),
        number_chips(analysis.game_type, &analysis.cold_numbers, "cold"),
    ));

    html.push_str(
        r#"            <h2>Frecuencias</h2>
            <table>
                <tr><th>Número</th><th>Frecuencia</th><th>%</th></tr>
"#,
    );
    for entry in &analysis.number_frequencies {
        html.push_str(&format!(
            "                <tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
            def.format_number(entry.number),
            entry.frequency,
            entry.percentage
        ));
    }

    html.push_str(&format!(
        r#"            </table>
        </div>
        <div class="footer">
            <p>📅 Actualizado: {}</p>
        </div>
    </div>
</body>
</html>
"#,
        analysis.last_updated.format("%Y-%m-%d %H:%M UTC")
    ));

    html
}

pub fn save_html_report_to_path(
    html_content: &str,
    filename: &str,
    report_dir: &Path,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(report_dir)?;
    let filepath = report_dir.join(filename);
    let mut file = File::create(&filepath)?;
    file.write_all(html_content.as_bytes())?;
    Ok(filepath)
}

pub async fn generate_and_save_report(
    manager: &RecordManager,
    game: GameType,
    report_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let analysis = manager.probability_analysis(game).await?;
    let html = generate_html_report(&analysis);
    let path = save_html_report_to_path(&html, &report_filename(game), report_dir)?;
    tracing::info!(game = %game, path = %path.display(), "report written");
    Ok(path)
}
