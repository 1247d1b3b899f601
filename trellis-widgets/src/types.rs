use std::rc::Rc;

use trellis_core::object::{register_type, Class, ObjectRef, TypeInfo};
use trellis_core::values::ValueType;

use crate::widget::Widget;

pub static WIDGET: TypeInfo = TypeInfo {
    name: "Widget",
    parent: None,
    construct: Some(new_widget),
};

pub static LABEL: TypeInfo = TypeInfo {
    name: "Label",
    parent: Some(&WIDGET),
    construct: Some(new_label),
};

pub static BUTTON: TypeInfo = TypeInfo {
    name: "Button",
    parent: Some(&WIDGET),
    construct: Some(new_button),
};

pub static BOX: TypeInfo = TypeInfo {
    name: "Box",
    parent: Some(&WIDGET),
    construct: Some(new_box),
};

pub static WINDOW: TypeInfo = TypeInfo {
    name: "Window",
    parent: Some(&WIDGET),
    construct: Some(new_window),
};

thread_local! {
    static WIDGET_CLASS: Rc<Class> = Class::builder(&WIDGET)
        .property("visible", ValueType::Bool, true)
        .property("name", ValueType::String, "")
        .build();

    static LABEL_CLASS: Rc<Class> = WIDGET_CLASS.with(|widget| {
        Class::builder(&LABEL)
            .extends(widget)
            .property("label", ValueType::String, "")
            .property("wrap", ValueType::Bool, false)
            .build()
    });

    static BUTTON_CLASS: Rc<Class> = WIDGET_CLASS.with(|widget| {
        Class::builder(&BUTTON)
            .extends(widget)
            .property("label", ValueType::String, "")
            .signal("clicked", &[], None)
            .build()
    });

    static BOX_CLASS: Rc<Class> = WIDGET_CLASS.with(|widget| {
        Class::builder(&BOX)
            .extends(widget)
            .property("spacing", ValueType::Int, 0)
            .build()
    });

    static WINDOW_CLASS: Rc<Class> = WIDGET_CLASS.with(|widget| {
        Class::builder(&WINDOW)
            .extends(widget)
            .property("title", ValueType::String, "")
            .build()
    });
}

pub(crate) fn new_widget() -> ObjectRef {
    Widget::new_ref(WIDGET_CLASS.with(Rc::clone))
}

pub(crate) fn new_label() -> ObjectRef {
    Widget::new_ref(LABEL_CLASS.with(Rc::clone))
}

pub(crate) fn new_button() -> ObjectRef {
    Widget::new_ref(BUTTON_CLASS.with(Rc::clone))
}

pub(crate) fn new_box() -> ObjectRef {
    Widget::new_ref(BOX_CLASS.with(Rc::clone))
}

pub(crate) fn new_window() -> ObjectRef {
    Widget::new_ref(WINDOW_CLASS.with(Rc::clone))
}

/// Make the widget types known to the global type registry by name.
pub fn register_types() {
    for info in [&WIDGET, &LABEL, &BUTTON, &BOX, &WINDOW] {
        register_type(info);
    }
}

#[cfg(test)]
mod test {
    use trellis_core::object::{resolve_type, PropertyHost, SignalHost};

    use super::*;

    #[test]
    fn inherited_properties() {
        let button = new_button();
        assert!(button.is_a(&WIDGET));
        assert!(!button.is_a(&LABEL));
        assert!(button.find_property("visible").is_some());
        assert!(button.find_property("label").is_some());
        assert!(button.find_signal("clicked").is_some());
        assert!(new_label().find_signal("clicked").is_none());
    }

    #[test]
    fn registered_by_name() {
        register_types();
        assert_eq!(resolve_type("Window"), Some(&WINDOW));
        assert_eq!(resolve_type("Box").and_then(|info| info.parent), Some(&WIDGET));
    }
}
