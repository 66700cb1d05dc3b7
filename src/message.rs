use crate::state::{display_time, Message as Msg, Metadata};
use leptos::IntoView;
use leptos::*;
use pulldown_cmark::{Event, Parser};

/// Renders each line as its own paragraph, with inline markdown. Raw HTML in
/// the content is escaped.
pub fn render_content(content: &str) -> String {
    let paragraphs = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let parser = Parser::new(&paragraphs).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        event => event,
    });
    let mut parsed = String::new();
    pulldown_cmark::html::push_html(&mut parsed, parser);
    parsed
}

fn usage(metadata: &Metadata) -> Option<String> {
    let mut parts = vec![];
    if let Some(duration) = metadata.duration {
        parts.push(format!("{duration:.2}s"));
    }
    if let Some(tokens) = metadata.tokens_used {
        parts.push(format!("{tokens} tokens"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

#[component]
pub fn Message(message: Msg) -> impl IntoView {
    let parsed = render_content(&message.content);
    let datemsg = display_time(&message.timestamp);
    let is_me = message.is_me();
    let is_error = message.is_error;
    let name = if is_me { "You" } else { "MediBook Assistant" };
    let usage = message.metadata.as_ref().and_then(usage);
    let tone = if is_error {
        "bg-red-100 text-red-800 dark:bg-red-900 dark:text-red-100"
    } else if is_me {
        "bg-blue-100 dark:bg-blue-800"
    } else {
        "bg-gray-100 dark:bg-gray-700"
    };
    let bubble = format!("flex flex-col leading-1.5 p-4 border-gray-200 rounded-e-xl rounded-es-xl {tone}");
    view! {
        <div class="flex items-start m-5 gap-2.5" class:flex-row-reverse=is_me>
            <div class="flex flex-col gap-1 max-w-[90%]">
                <div class="flex items-center space-x-2 rtl:space-x-reverse">
                    <span class="text-sm font-semibold text-gray-900 dark:text-white">
                        {name}
                    </span>
                    <span class="text-sm font-normal text-gray-500 dark:text-gray-400">
                        {datemsg}
                    </span>
                </div>
                <div class=bubble>
                    <div class="text-sm font-normal space-y-2" inner_html=parsed />
                </div>
                {usage
                    .map(|usage| {
                        view! {
                            <span class="text-xs font-normal text-gray-500 dark:text-gray-400">
                                {usage}
                            </span>
                        }
                    })}
            </div>
        </div>
    }
}
