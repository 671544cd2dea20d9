//! Interactive terminal mode: type an email, watch the three agents run.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::pipeline::orchestrator::DEFAULT_SUBJECT;
use crate::pipeline::{DocumentPipeline, EmailRequest, PipelineResult};

/// Outcome of reading one email from the terminal.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Empty sender or end of input.
    Quit,
    /// Sender given but the body was blank.
    EmptyBody,
    Request(EmailRequest),
}

/// Read one email from `lines`.
///
/// Prompts for sender, subject, and body on stderr. The body ends at two
/// consecutive blank lines or EOF.
pub async fn read_request<R>(lines: &mut Lines<R>) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    eprint!("From (empty to quit): ");
    let sender = match lines.next_line().await? {
        Some(line) if !line.trim().is_empty() => line.trim().to_string(),
        _ => return Ok(Input::Quit),
    };

    eprint!("Subject [{}]: ", DEFAULT_SUBJECT);
    let subject = match lines.next_line().await? {
        Some(line) if !line.trim().is_empty() => line.trim().to_string(),
        Some(_) => DEFAULT_SUBJECT.to_string(),
        None => return Ok(Input::Quit),
    };

    eprintln!("Body (finish with two blank lines):");
    let mut body_lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 2 {
                break;
            }
        } else {
            blank_run = 0;
        }
        body_lines.push(line);
    }
    let body = body_lines.join("\n").trim().to_string();
    if body.is_empty() {
        return Ok(Input::EmptyBody);
    }

    Ok(Input::Request(EmailRequest::new(sender, subject, body)))
}

/// Human-readable rendering of a pipeline result.
pub fn render_result(result: &PipelineResult) -> String {
    let mut out = String::new();
    for step in result.agent_steps.steps() {
        out.push_str(&format!("{} {} [{}]\n", step.icon, step.agent, step.status));
        for (key, value) in &step.data {
            if key == "raw_output" || key == "documents" {
                continue;
            }
            out.push_str(&format!("   {key}: {value}\n"));
        }
    }
    if let Some(doc) = &result.approved_document {
        out.push_str(&format!("\n📄 {} ({})\n", doc.name, doc.url));
    }
    out.push_str("\n── Reply ──\n");
    out.push_str(&result.final_response);
    out.push('\n');
    out
}

/// Run the REPL over stdin until the user quits.
pub async fn run(pipeline: &DocumentPipeline) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let request = match read_request(&mut lines).await? {
            Input::Request(request) => request,
            Input::EmptyBody => {
                eprintln!("⚠️  Email body cannot be empty\n");
                continue;
            }
            Input::Quit => {
                eprintln!("Bye.");
                return Ok(());
            }
        };

        eprintln!("⏳ Processing...");
        match pipeline
            .run(&request.sender, &request.subject, &request.body)
            .await
        {
            Ok(result) => println!("\n{}", render_result(&result)),
            Err(e) => {
                tracing::error!("Pipeline failed: {}", e);
                eprintln!("❌ {}", e);
            }
        }
    }
}
