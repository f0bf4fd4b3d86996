use crate::components::ui::{Button, ButtonSize, ButtonVariant};
use leptos::ev;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;
use leptos_ui::clx;
use tw_merge::tw_merge;

mod components {
    use super::*;
    clx! {ModalHeader, div, "mb-3 space-y-1"}
    clx! {ModalTitle, div, "text-sm font-medium"}
    clx! {ModalDescription, div, "text-xs text-muted-foreground"}
    clx! {ModalFooter, div, "flex items-center justify-end gap-2 pt-3"}
}

pub use components::*;

/// Centered overlay panel shown while `open` is true.
#[component]
pub fn Modal(
    #[prop(into)] open: Signal<bool>,
    #[prop(into, optional)] class: String,
    children: ChildrenFn,
) -> impl IntoView {
    let panel_class = tw_merge!(
        "w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg",
        class
    );
    let children = StoredValue::new(children);

    view! {
        <Show when=move || open.get() fallback=|| ().into_view()>
            <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                <div class=panel_class.clone()>
                    {children.with_value(|c| c())}
                </div>
            </div>
        </Show>
    }
}

/// Yes/no confirmation for destructive actions.
#[component]
pub fn ConfirmDialog(
    open: RwSignal<bool>,
    #[prop(into)] title: String,
    #[prop(into)] message: Signal<String>,
    #[prop(into, default = "Delete".to_string())] confirm_label: String,
    #[prop(into, default = Signal::stored(false))] busy: Signal<bool>,
    on_confirm: Callback<()>,
) -> impl IntoView {
    let title = StoredValue::new(title);
    let confirm_label = StoredValue::new(confirm_label);

    // Esc cancels, unless the action is already running.
    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape"
            && open.try_get_untracked() == Some(true)
            && !busy.try_get_untracked().unwrap_or(false)
        {
            open.set(false);
        }
    });
    on_cleanup(move || key_handle.remove());

    view! {
        <Modal open=open>
            <ModalHeader>
                <ModalTitle class="text-destructive">{title.get_value()}</ModalTitle>
                <ModalDescription>{move || message.get()}</ModalDescription>
            </ModalHeader>
            <ModalFooter>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=move || busy.get()
                    on:click=move |_| open.set(false)
                >
                    "Cancel"
                </Button>
                <Button
                    variant=ButtonVariant::Destructive
                    size=ButtonSize::Sm
                    attr:disabled=move || busy.get()
                    on:click=move |_| on_confirm.run(())
                >
                    {confirm_label.get_value()}
                </Button>
            </ModalFooter>
        </Modal>
    }
}
