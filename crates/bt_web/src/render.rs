use std::fmt::Write;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bt_core::{Analysis, AnalysisOutcome, InfoTopic, Prediction, Session, TumorClass};
use image::{DynamicImage, ImageFormat};
use tracing::warn;

const PAGE_TITLE: &str = "Brain Tumor Detection | ViT";
const THUMBNAIL_SIZE: u32 = 320;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f5f6fa; color: #1f2430; }
header { background: #1f2430; color: #fff; padding: 1rem 2rem; }
header h1 { margin: 0; font-size: 1.6rem; }
main { display: flex; gap: 2rem; padding: 2rem; flex-wrap: wrap; }
nav { flex: 0 0 220px; display: flex; flex-direction: column; gap: .5rem; }
nav form { margin: 0; }
nav button { width: 100%; padding: .6rem; border: 1px solid #c8cbd6; background: #fff; border-radius: 6px; cursor: pointer; text-align: left; }
nav button.active { background: #3b5bdb; color: #fff; border-color: #3b5bdb; }
section { flex: 1 1 420px; }
.info { background: #fff; border-radius: 8px; padding: 1rem 1.5rem; margin-bottom: 1.5rem; }
.upload { background: #fff; border-radius: 8px; padding: 1rem 1.5rem; margin-bottom: 1.5rem; }
.result { display: flex; gap: 1.5rem; align-items: flex-start; flex-wrap: wrap; }
.result img { max-width: 320px; border-radius: 8px; border: 1px solid #c8cbd6; }
.banner { padding: 1rem 1.5rem; border-radius: 8px; color: #fff; min-width: 260px; }
.banner h2 { margin: 0 0 .5rem 0; }
.banner-tumor { background: #d64545; }
.banner-clear { background: #2f9e44; }
.banner-error { background: #e8a317; color: #1f2430; }
.disclaimer { font-size: .85rem; color: #5c6070; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Downscaled PNG preview as a `data:` URI.
pub fn thumbnail_data_uri(image: &DynamicImage) -> Option<String> {
    let thumbnail = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let mut png = Vec::new();
    if let Err(e) = thumbnail.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
        warn!("failed to encode preview: {}", e);
        return None;
    }
    Some(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

pub fn banner_class(class: TumorClass) -> &'static str {
    match class {
        TumorClass::Tumor => "banner-tumor",
        TumorClass::NoTumor => "banner-clear",
    }
}

pub fn render_page(session: &Session, model_name: &str) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n\
         <header><h1>🧠 Brain Tumor Detection</h1>\
         <p>Upload a brain MRI scan and a Vision Transformer will check it for signs of a tumor.</p></header>\n<main>\n",
        PAGE_TITLE, STYLE
    );

    render_menu(&mut html, session.selected_topic());

    html.push_str("<section>\n");
    if let Some(topic) = session.selected_topic() {
        render_topic(&mut html, topic);
    }
    render_upload(&mut html);
    if let Some(analysis) = session.analysis() {
        render_analysis(&mut html, analysis);
    }
    let _ = write!(
        html,
        "<p class=\"disclaimer\">Model: {}. Results are for educational purposes only and are not a medical diagnosis.</p>\n\
         <form method=\"post\" action=\"/reset\"><button type=\"submit\">Start over</button></form>\n",
        escape_html(model_name)
    );
    html.push_str("</section>\n</main>\n</body>\n</html>\n");
    html
}

fn render_menu(html: &mut String, selected: Option<InfoTopic>) {
    html.push_str("<nav>\n<h3>Learn more</h3>\n");
    for topic in InfoTopic::ALL {
        let class = if selected == Some(topic) { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            "<form method=\"post\" action=\"/topics/{}\"><button type=\"submit\"{}>{}</button></form>",
            topic.slug(),
            class,
            escape_html(topic.title())
        );
    }
    html.push_str("</nav>\n");
}

fn render_topic(html: &mut String, topic: InfoTopic) {
    let _ = write!(html, "<div class=\"info\" id=\"topic-{}\">\n<h2>{}</h2>\n", topic.slug(), escape_html(topic.title()));
    for paragraph in topic.paragraphs() {
        let _ = writeln!(html, "<p>{}</p>", escape_html(paragraph));
    }
    html.push_str("<form method=\"post\" action=\"/close-topic\"><button type=\"submit\">Close</button></form>\n</div>\n");
}

fn render_upload(html: &mut String) {
    html.push_str(
        "<div class=\"upload\">\n<h2>Upload an MRI image</h2>\n\
         <form method=\"post\" action=\"/predict\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"image\" accept=\".jpg,.jpeg,.png,image/jpeg,image/png\">\n\
         <button type=\"submit\">Analyze</button>\n</form>\n</div>\n",
    );
}

fn render_analysis(html: &mut String, analysis: &Analysis) {
    html.push_str("<div class=\"result\">\n");
    if let Some(thumbnail) = &analysis.thumbnail {
        let _ = writeln!(
            html,
            "<figure><img src=\"{}\" alt=\"Uploaded scan\"><figcaption>{}</figcaption></figure>",
            thumbnail,
            escape_html(&analysis.file_name)
        );
    }
    match &analysis.outcome {
        AnalysisOutcome::Completed(prediction) => render_prediction(html, prediction),
        AnalysisOutcome::Failed { message } => {
            let _ = write!(
                html,
                "<div class=\"banner banner-error\">\n<h2>Could not analyze {}</h2>\n<p>{}</p>\n</div>\n",
                escape_html(&analysis.file_name),
                escape_html(message)
            );
        }
    }
    html.push_str(
        "<form method=\"post\" action=\"/clear-analysis\"><button type=\"submit\">Clear result</button></form>\n</div>\n",
    );
}

fn render_prediction(html: &mut String, prediction: &Prediction) {
    let _ = write!(
        html,
        "<div class=\"banner {}\">\n<h2>{}</h2>\n<p>Confidence: <strong>{}</strong></p>\n<ul>\n",
        banner_class(prediction.class),
        prediction.class.headline(),
        prediction.confidence_display()
    );
    for class in TumorClass::ALL {
        let _ = writeln!(
            html,
            "<li>{}: {:.2}%</li>",
            class.label(),
            prediction.probability(class) * 100.0
        );
    }
    let _ = write!(
        html,
        "</ul>\n<p><small>Analyzed {}</small></p>\n</div>\n",
        prediction.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
