use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::tw_merge;

mod components {
    use super::*;
    clx! {Alert, div, "relative w-full rounded-lg border px-4 py-3 text-sm"}
    clx! {AlertDescription, p, "text-sm [&_p]:leading-relaxed"}
}

pub use components::*;

/// Error or notice banner with a dismiss button. Renders nothing while `message` is `None`.
#[component]
pub fn DismissibleAlert(
    message: RwSignal<Option<String>>,
    #[prop(optional)] success: bool,
    #[prop(into, optional)] class: String,
) -> impl IntoView {
    let tone = if success {
        "border-success/30 text-success"
    } else {
        "border-destructive/30 text-destructive"
    };
    let merged_class = tw_merge!("flex items-start justify-between gap-2", tone, class);

    view! {
        {move || {
            let class = merged_class.clone();
            message.get().map(move |m| view! {
                <Alert class=class>
                    <AlertDescription class="text-xs">{m}</AlertDescription>
                    <button
                        type="button"
                        class="text-xs opacity-70 hover:opacity-100"
                        aria-label="Dismiss"
                        on:click=move |_| message.set(None)
                    >
                        "×"
                    </button>
                </Alert>
            })
        }}
    }
}
