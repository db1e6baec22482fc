//! UI Builder module for creating keyboards and formatting messages

use crate::callback::{Callback, CallbackData, CATALOG_NEXT, CATALOG_PREV};
use crate::chat::{InlineButton, InlineRows, Keyboard};
use crate::config::BotSettings;
use crate::domain::{Button, Cart, CatalogItem, Category, Location, Order, OrderType, Position};
use crate::errors::CallbackError;
use crate::localization::Texts;

/// Telegram allows at most ten photos per album; message ids of the album
/// also have to fit into the 64 byte callback data of the controls.
pub const MAX_ALBUM_IMAGES: usize = 6;

const MAX_BUTTON_TITLE_CHARS: usize = 24;

fn button(texts: &Texts, key: &str, callback: Callback) -> Result<InlineButton, CallbackError> {
    InlineButton::new(texts.get(key), &callback.data()?)
}

fn single_column(texts: &Texts, entries: &[(&str, Callback)]) -> Result<InlineRows, CallbackError> {
    entries
        .iter()
        .map(|(key, callback)| Ok(vec![button(texts, key, *callback)?]))
        .collect()
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_BUTTON_TITLE_CHARS {
        let truncated: String = title.chars().take(MAX_BUTTON_TITLE_CHARS - 1).collect();
        format!("{truncated}…")
    } else {
        title.to_string()
    }
}

/// Static keyboard layouts, built once from texts and settings
#[derive(Clone, Debug)]
pub struct Keyboards {
    pub menu_label: String,
    pub cart_label: String,
    pub add_position_label: String,
    menu: InlineRows,
    order_type: InlineRows,
    location: InlineRows,
    category: InlineRows,
    button: InlineRows,
    calculator_order_type: InlineRows,
    calculator_location: InlineRows,
    calculator_category: InlineRows,
    calculate_more: InlineRows,
    cart_preview: InlineRows,
    position_added: InlineRows,
    faq: InlineRows,
}

impl Keyboards {
    pub fn new(texts: &Texts, settings: &BotSettings) -> Result<Self, CallbackError> {
        let faq = settings
            .faq
            .iter()
            .enumerate()
            .map(|(i, entry)| Ok(vec![InlineButton::new(&entry.question, &Callback::FaqAnswer(i).data()?)?]))
            .collect::<Result<InlineRows, CallbackError>>()?;

        Ok(Self {
            menu_label: texts.get("button-menu"),
            cart_label: texts.get("button-cart"),
            add_position_label: texts.get("button-add-position"),
            menu: single_column(
                texts,
                &[
                    ("menu-catalog", Callback::Catalog),
                    ("menu-make-order", Callback::MakeOrder),
                    ("menu-cart", Callback::GetCart),
                    ("menu-my-orders", Callback::MyOrders),
                    ("menu-calculator", Callback::Calculator),
                    ("menu-faq", Callback::Faq),
                    ("menu-guide", Callback::GuideStep(1)),
                ],
            )?,
            order_type: single_column(
                texts,
                &[
                    ("order-type-express", Callback::OrderType(OrderType::Express)),
                    ("order-type-normal", Callback::OrderType(OrderType::Normal)),
                ],
            )?,
            location: single_column(
                texts,
                &[
                    ("location-spb", Callback::Location(Location::SaintPetersburg)),
                    ("location-izhevsk", Callback::Location(Location::Izhevsk)),
                    ("location-other", Callback::Location(Location::Other)),
                ],
            )?,
            category: single_column(
                texts,
                &[
                    ("category-light", Callback::Category(Category::Light)),
                    ("category-other", Callback::Category(Category::Other)),
                    ("category-heavy", Callback::Category(Category::Heavy)),
                ],
            )?,
            button: single_column(
                texts,
                &[
                    ("button-turquoise", Callback::Button(Button::Turquoise)),
                    ("button-grey", Callback::Button(Button::Grey)),
                    ("button-used95", Callback::Button(Button::Used95)),
                ],
            )?,
            calculator_order_type: single_column(
                texts,
                &[
                    ("order-type-express", Callback::CalculatorOrderType(OrderType::Express)),
                    ("order-type-normal", Callback::CalculatorOrderType(OrderType::Normal)),
                ],
            )?,
            calculator_location: single_column(
                texts,
                &[
                    ("location-spb", Callback::CalculatorLocation(Location::SaintPetersburg)),
                    ("location-izhevsk", Callback::CalculatorLocation(Location::Izhevsk)),
                    ("location-other", Callback::CalculatorLocation(Location::Other)),
                ],
            )?,
            calculator_category: single_column(
                texts,
                &[
                    ("category-light", Callback::CalculatorCategory(Category::Light)),
                    ("category-other", Callback::CalculatorCategory(Category::Other)),
                    ("category-heavy", Callback::CalculatorCategory(Category::Heavy)),
                ],
            )?,
            calculate_more: single_column(
                texts,
                &[("calculate-more", Callback::CalculateMore), ("back-to-menu", Callback::Menu)],
            )?,
            cart_preview: single_column(
                texts,
                &[
                    ("cart-edit", Callback::EditCart),
                    ("cart-add-position", Callback::AddPosition),
                    ("cart-checkout", Callback::Checkout),
                ],
            )?,
            position_added: single_column(
                texts,
                &[
                    ("menu-cart", Callback::GetCart),
                    ("cart-add-position", Callback::AddPosition),
                    ("cart-checkout", Callback::Checkout),
                ],
            )?,
            faq,
        })
    }

    pub fn bottom_menu(&self) -> Keyboard {
        Keyboard::Reply(vec![
            vec![self.menu_label.clone(), self.cart_label.clone()],
            vec![self.add_position_label.clone()],
        ])
    }

    pub fn menu(&self) -> Keyboard {
        Keyboard::Inline(self.menu.clone())
    }

    pub fn order_type(&self) -> Keyboard {
        Keyboard::Inline(self.order_type.clone())
    }

    pub fn location(&self) -> Keyboard {
        Keyboard::Inline(self.location.clone())
    }

    pub fn category(&self) -> Keyboard {
        Keyboard::Inline(self.category.clone())
    }

    pub fn button(&self) -> Keyboard {
        Keyboard::Inline(self.button.clone())
    }

    pub fn calculator_order_type(&self) -> Keyboard {
        Keyboard::Inline(self.calculator_order_type.clone())
    }

    pub fn calculator_location(&self) -> Keyboard {
        Keyboard::Inline(self.calculator_location.clone())
    }

    pub fn calculator_category(&self) -> Keyboard {
        Keyboard::Inline(self.calculator_category.clone())
    }

    pub fn calculate_more(&self) -> Keyboard {
        Keyboard::Inline(self.calculate_more.clone())
    }

    pub fn cart_preview(&self) -> Keyboard {
        Keyboard::Inline(self.cart_preview.clone())
    }

    pub fn position_added(&self) -> Keyboard {
        Keyboard::Inline(self.position_added.clone())
    }

    pub fn faq(&self) -> Keyboard {
        Keyboard::Inline(self.faq.clone())
    }
}

/// One "remove position N" button per cart line
pub fn edit_cart_buttons(texts: &Texts, cart: &Cart) -> Result<InlineRows, CallbackError> {
    let mut rows = cart
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let label = texts.get_with_args("cart-remove-position", &[("index", (i + 1).to_string())]);
            Ok(vec![InlineButton::new(label, &Callback::RemovePosition(i).data()?)?])
        })
        .collect::<Result<InlineRows, CallbackError>>()?;
    rows.push(vec![button(texts, "back-to-menu", Callback::Menu)?]);
    Ok(rows)
}

/// Prev/next buttons under a catalog album. Both carry the album message ids
/// so the album can be edited in place.
pub fn catalog_buttons(
    texts: &Texts,
    prev: Option<&CatalogItem>,
    next: Option<&CatalogItem>,
    message_ids: &[i32],
) -> Result<InlineRows, CallbackError> {
    let mut row = Vec::new();
    if let Some(prev) = prev {
        let label = texts.get_with_args("catalog-prev", &[("title", truncate_title(&prev.title))]);
        row.push(InlineButton::new(
            label,
            &CallbackData::with_message_ids(CATALOG_PREV, message_ids.to_vec()),
        )?);
    }
    if let Some(next) = next {
        let label = texts.get_with_args("catalog-next", &[("title", truncate_title(&next.title))]);
        row.push(InlineButton::new(
            label,
            &CallbackData::with_message_ids(CATALOG_NEXT, message_ids.to_vec()),
        )?);
    }

    let mut rows = Vec::new();
    if !row.is_empty() {
        rows.push(row);
    }
    rows.push(vec![button(texts, "back-to-menu", Callback::Menu)?]);
    Ok(rows)
}

pub const GUIDE_STEPS: u8 = 4;

/// Arrows between guide steps; the last step offers adding a position
pub fn guide_buttons(texts: &Texts, step: u8, message_ids: &[i32]) -> Result<InlineRows, CallbackError> {
    let mut arrows = Vec::new();
    if step > 1 {
        arrows.push(InlineButton::new(
            texts.get("guide-prev"),
            &CallbackData::with_message_ids(Callback::GuideStep(step - 1).code()?, message_ids.to_vec()),
        )?);
    }
    if step < GUIDE_STEPS {
        arrows.push(InlineButton::new(
            texts.get("guide-next"),
            &CallbackData::with_message_ids(Callback::GuideStep(step + 1).code()?, message_ids.to_vec()),
        )?);
    }

    let mut rows = vec![arrows];
    if step == GUIDE_STEPS {
        rows.push(vec![button(texts, "guide-add-position", Callback::AddPosition)?]);
    }
    Ok(rows)
}

/// "I paid" button; the order short id rides along as a string payload
pub fn paid_buttons(texts: &Texts, short_id: &str) -> Result<InlineRows, CallbackError> {
    Ok(vec![vec![InlineButton::new(
        texts.get("button-paid"),
        &CallbackData::with_text(Callback::Paid.code()?, short_id),
    )?]])
}

pub fn button_label(texts: &Texts, button: Button) -> String {
    texts.get(match button {
        Button::Turquoise => "button-turquoise",
        Button::Grey => "button-grey",
        Button::Used95 => "button-used95",
    })
}

pub fn order_type_label(texts: &Texts, is_express: bool) -> String {
    texts.get(if is_express {
        "order-type-express"
    } else {
        "order-type-normal"
    })
}

fn format_position(texts: &Texts, index: usize, position: &Position) -> String {
    let size = if position.has_size() {
        position.size.clone()
    } else {
        texts.get("no-size")
    };
    texts.get_with_args(
        "cart-position",
        &[
            ("index", (index + 1).to_string()),
            ("link", position.shop_link.clone()),
            ("size", size),
            ("button", button_label(texts, position.button)),
            ("price_yuan", position.price_yuan.to_string()),
            ("price_rub", position.price_rub.to_string()),
        ],
    )
}

fn format_positions(texts: &Texts, cart: &Cart) -> String {
    cart.iter()
        .enumerate()
        .map(|(i, position)| format_position(texts, i, position))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cart listing with totals
pub fn format_cart(texts: &Texts, cart: &Cart) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        texts.get("cart-title"),
        format_positions(texts, cart),
        texts.get_with_args(
            "cart-total",
            &[
                ("total_rub", cart.total_rub().to_string()),
                ("total_yuan", cart.total_yuan().to_string()),
            ],
        )
    )
}

pub fn format_order_preview(texts: &Texts, order: &Order) -> String {
    let header = texts.get_with_args(
        "order-preview",
        &[
            ("short_id", order.short_id.clone()),
            ("order_type", order_type_label(texts, order.is_express)),
            ("full_name", order.customer.full_name.clone().unwrap_or_default()),
            ("phone", order.customer.phone_number.clone().unwrap_or_default()),
            ("address", order.delivery_address.clone()),
        ],
    );
    format!(
        "{}\n\n{}\n\n{}",
        header,
        format_positions(texts, &order.cart),
        texts.get_with_args("order-total", &[("total_rub", order.amount_rub.to_string())])
    )
}

pub fn format_orders(texts: &Texts, orders: &[Order]) -> String {
    let yes_no = |flag: bool| texts.get(if flag { "yes" } else { "no" });
    let mut result = texts.get("my-orders-title");

    for order in orders {
        let summary = texts.get_with_args(
            "order-summary",
            &[
                ("short_id", order.short_id.clone()),
                ("date", order.created_at.format("%d.%m.%Y").to_string()),
                ("paid", yes_no(order.is_paid)),
                ("approved", yes_no(order.is_approved)),
                ("status", texts.get(&format!("status-{}", order.status.as_str()))),
                ("total_rub", order.amount_rub.to_string()),
            ],
        );
        result.push_str(&format!("\n\n{}\n{}", summary, format_positions(texts, &order.cart)));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::MAX_CART_POSITIONS;
    use crate::chat::Keyboard;
    use uuid::Uuid;

    fn texts() -> Texts {
        Texts::embedded().unwrap()
    }

    fn position(size: &str) -> Position {
        Position {
            position_id: Uuid::new_v4(),
            shop_link: "https://dw4.co/t/A/abc".to_string(),
            size: size.to_string(),
            button: Button::Grey,
            category: Some(Category::Light),
            price_yuan: 100,
            price_rub: 2000,
        }
    }

    #[test]
    fn test_static_keyboards_build() {
        let keyboards = Keyboards::new(&texts(), &BotSettings::default()).unwrap();
        match keyboards.menu() {
            Keyboard::Inline(rows) => {
                assert_eq!(rows.len(), 7);
                assert_eq!(rows[0][0].data, Callback::Catalog.code().unwrap().to_string());
            }
            Keyboard::Reply(_) => panic!("menu must be inline"),
        }
        match keyboards.faq() {
            Keyboard::Inline(rows) => assert_eq!(rows[1][0].data, "1401"),
            Keyboard::Reply(_) => panic!("faq must be inline"),
        }
    }

    #[test]
    fn test_edit_cart_buttons_use_removal_band() {
        let cart = Cart::from(vec![position("42"), position("#")]);
        let rows = edit_cart_buttons(&texts(), &cart).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].data, "1000");
        assert_eq!(rows[1][0].data, "1001");
    }

    #[test]
    fn test_edit_cart_buttons_reject_overfull_cart() {
        let texts = texts();
        let full = Cart::from((0..MAX_CART_POSITIONS).map(|_| position("42")).collect::<Vec<_>>());
        let rows = edit_cart_buttons(&texts, &full).unwrap();
        assert_eq!(rows[MAX_CART_POSITIONS - 1][0].data, "1199");

        let mut overfull = full.clone();
        overfull.add(position("43"));
        assert_eq!(
            edit_cart_buttons(&texts, &overfull),
            Err(CallbackError::IndexOutOfBand(MAX_CART_POSITIONS))
        );
    }

    #[test]
    fn test_catalog_buttons_only_for_existing_neighbours() {
        let texts = texts();
        let next = CatalogItem::new("Nike Dunk Low Panda Black White Edition", vec![]);

        let rows = catalog_buttons(&texts, None, Some(&next), &[10, 11]).unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0][0].data, "m10,11:1201");
        assert!(rows[0][0].text.contains('…'));

        let rows = catalog_buttons(&texts, None, None, &[10]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_guide_buttons() {
        let texts = texts();
        let first = guide_buttons(&texts, 1, &[5]).unwrap();
        assert_eq!(first[0].len(), 1);
        assert_eq!(first[0][0].data, format!("m5:{}", Callback::GuideStep(2).code().unwrap()));

        let last = guide_buttons(&texts, 4, &[5]).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[1][0].data, Callback::AddPosition.code().unwrap().to_string());
    }

    #[test]
    fn test_format_cart_renders_missing_size() {
        let texts = texts();
        let cart = Cart::from(vec![position("#")]);
        let text = format_cart(&texts, &cart);
        assert!(text.contains(&texts.get("no-size")));
        assert!(text.contains("2000"));
    }

    #[test]
    fn test_paid_button_carries_short_id() {
        let rows = paid_buttons(&texts(), "AB12CD").unwrap();
        assert_eq!(rows[0][0].data, format!("sAB12CD:{}", Callback::Paid.code().unwrap()));
    }
}
