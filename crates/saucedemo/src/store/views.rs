// Page templates of the simulated store

use super::accounts;
use super::catalog::{self, Product, SortOrder, format_price};
use super::{MENU_ANIMATION, Session, SimulatedStore, TAX_PERCENT};
use autowait::driver::memory::{NodeSpec, Scope, element};

const MENU: &str = ".bm-menu-wrap";
const BADGE: &str = r#"[data-test="shopping-cart-badge"]"#;

pub(super) fn login(store: &SimulatedStore, error: Option<&str>) -> NodeSpec {
    let submit = {
        let store = store.clone();
        move |scope: &mut Scope<'_>| {
            let username = scope.value_of("#user-name").unwrap_or_default();
            let password = scope.value_of("#password").unwrap_or_default();
            match accounts::authenticate(&username, &password) {
                Ok(()) => {
                    store.sign_in(&username);
                    scope.navigate(store.url("inventory.html"));
                }
                Err(err) => {
                    tracing::debug!("Login refused for '{}': {}", username, err);
                    show_error(scope, &err.to_string());
                }
            }
        }
    };

    let mut errors = element("div").class("error-message-container");
    if let Some(message) = error {
        errors = errors.child(error_message(message));
    }

    element("body").child(
        element("div").class("login_container").children([
            element("div").class("login_logo").text("Swag Labs"),
            element("div").class("login_wrapper").child(
                element("div").class("login-box").child(element("form").children([
                    element("div").class("form_group").child(
                        element("input")
                            .class("input_error form_input")
                            .id("user-name")
                            .data_test("username")
                            .attr("placeholder", "Username")
                            .attr("type", "text"),
                    ),
                    element("div").class("form_group").child(
                        element("input")
                            .class("input_error form_input")
                            .id("password")
                            .data_test("password")
                            .attr("placeholder", "Password")
                            .attr("type", "password"),
                    ),
                    errors,
                    element("input")
                        .class("submit-button btn_action")
                        .id("login-button")
                        .data_test("login-button")
                        .attr("type", "submit")
                        .value("Login")
                        .on_click(submit),
                ])),
            ),
        ]),
    )
}

fn error_message(message: &str) -> NodeSpec {
    element("h3").data_test("error").text(message)
}

/// Replaces the form's error banner.
fn show_error(scope: &mut Scope<'_>, message: &str) {
    scope.remove(r#"[data-test="error"]"#);
    scope.append(".error-message-container", error_message(message));
}

pub(super) fn inventory(store: &SimulatedStore, session: &Session) -> NodeSpec {
    let sort = {
        let store = store.clone();
        move |scope: &mut Scope<'_>| {
            let value = scope.target_value().unwrap_or_default();
            if let Some(order) = SortOrder::from_value(&value) {
                store.set_sort_order(order);
                scope.rerender();
            }
        }
    };
    let sorter = element("span").class("select_container").children([
        element("span")
            .class("active_option")
            .data_test("active-option")
            .text(session.sort.label()),
        element("select")
            .class("product_sort_container")
            .data_test("product-sort-container")
            .value(session.sort.value())
            .children(SortOrder::ALL.map(|order| {
                element("option").attr("value", order.value()).text(order.label())
            }))
            .on_change(sort),
    ]);

    let items = session
        .sort
        .sorted()
        .into_iter()
        .map(|product| inventory_item(store, session, product));

    layout(
        store,
        session,
        "Products",
        Some(sorter),
        element("div").id("inventory_container").child(
            element("div")
                .class("inventory_list")
                .data_test("inventory-list")
                .children(items),
        ),
    )
}

fn inventory_item(
    store: &SimulatedStore,
    session: &Session,
    product: &'static Product,
) -> NodeSpec {
    let link = format!("inventory-item.html?id={}", product.id);
    element("div")
        .class("inventory_item")
        .data_test("inventory-item")
        .children([
            element("div").class("inventory_item_img").child(
                element("a")
                    .id(&format!("item_{}_img_link", product.id))
                    .data_test(&format!("item-{}-img-link", product.id))
                    .attr("href", link.as_str())
                    .child(element("img").class("inventory_item_img").attr("alt", product.name)),
            ),
            element("div").class("inventory_item_description").children([
                element("div").class("inventory_item_label").children([
                    element("a")
                        .id(&format!("item_{}_title_link", product.id))
                        .data_test(&format!("item-{}-title-link", product.id))
                        .attr("href", link.as_str())
                        .child(item_name(product)),
                    item_description(product),
                ]),
                element("div")
                    .class("pricebar")
                    .children([item_price(product), cart_button(store, session, product, true)]),
            ]),
        ])
}

fn item_name(product: &Product) -> NodeSpec {
    element("div")
        .class("inventory_item_name")
        .data_test("inventory-item-name")
        .text(product.name)
}

fn item_description(product: &Product) -> NodeSpec {
    element("div")
        .class("inventory_item_desc")
        .data_test("inventory-item-desc")
        .text(product.description)
}

fn item_price(product: &Product) -> NodeSpec {
    element("div")
        .class("inventory_item_price")
        .data_test("inventory-item-price")
        .text(product.price())
}

/// Add or remove button for a product. List pages suffix the `data-test`
/// value with the product slug; the detail page does not.
fn cart_button(
    store: &SimulatedStore,
    session: &Session,
    product: &'static Product,
    suffixed: bool,
) -> NodeSpec {
    let store = store.clone();
    if session.cart.iter().any(|p| p.id == product.id) {
        let data_test = if suffixed { product.remove_button() } else { "remove".to_string() };
        element("button")
            .class("btn btn_secondary btn_small btn_inventory")
            .id(&product.remove_button())
            .data_test(&data_test)
            .text("Remove")
            .on_click(move |scope| {
                store.remove_from_cart(product);
                scope.rerender();
            })
    } else {
        let data_test = if suffixed { product.add_button() } else { "add-to-cart".to_string() };
        element("button")
            .class("btn btn_primary btn_small btn_inventory")
            .id(&product.add_button())
            .data_test(&data_test)
            .text("Add to cart")
            .on_click(move |scope| {
                store.add_to_cart(product);
                scope.rerender();
            })
    }
}

pub(super) fn product(
    store: &SimulatedStore,
    session: &Session,
    product: &'static Product,
) -> NodeSpec {
    let back = {
        let url = store.url("inventory.html");
        move |scope: &mut Scope<'_>| scope.navigate(url.clone())
    };
    let header_extra = element("button")
        .class("btn btn_secondary back btn_large inventory_details_back_button")
        .id("back-to-products")
        .data_test("back-to-products")
        .text("Back to products")
        .on_click(back);

    layout(
        store,
        session,
        "",
        Some(header_extra),
        element("div").class("inventory_details").data_test("inventory-container").child(
            element("div")
                .class("inventory_details_container")
                .data_test("inventory-item")
                .children([
                    element("img").class("inventory_details_img").attr("alt", product.name),
                    element("div").class("inventory_details_desc_container").children([
                        item_name(product).class("inventory_details_name large_size"),
                        item_description(product).class("inventory_details_desc large_size"),
                        item_price(product).class("inventory_details_price"),
                        cart_button(store, session, product, false),
                    ]),
                ]),
        ),
    )
}

pub(super) fn cart(store: &SimulatedStore, session: &Session) -> NodeSpec {
    let rows = session
        .cart
        .iter()
        .map(|product| cart_item(store, session, product, true));

    let footer = element("div").class("cart_footer").children([
        navigate_button("continue-shopping", "Continue Shopping", store.url("inventory.html"))
            .class("btn btn_secondary back btn_medium"),
        navigate_button("checkout", "Checkout", store.url("checkout-step-one.html"))
            .class("btn btn_action btn_medium checkout_button"),
    ]);

    layout(
        store,
        session,
        "Your Cart",
        None,
        element("div").id("cart_contents_container").child(element("div").children([
            element("div")
                .class("cart_list")
                .data_test("cart-list")
                .child(
                    element("div")
                        .class("cart_quantity_label")
                        .data_test("cart-quantity-label")
                        .text("QTY"),
                )
                .child(
                    element("div")
                        .class("cart_desc_label")
                        .data_test("cart-desc-label")
                        .text("Description"),
                )
                .children(rows),
            footer,
        ])),
    )
}

fn cart_item(
    store: &SimulatedStore,
    session: &Session,
    product: &'static Product,
    removable: bool,
) -> NodeSpec {
    let mut pricebar = element("div").class("item_pricebar").child(item_price(product));
    if removable {
        pricebar = pricebar.child(cart_button(store, session, product, true));
    }
    element("div")
        .class("cart_item")
        .data_test("inventory-item")
        .children([
            element("div")
                .class("cart_quantity")
                .data_test("item-quantity")
                .text("1"),
            element("div").class("cart_item_label").children([
                element("a")
                    .id(&format!("item_{}_title_link", product.id))
                    .data_test(&format!("item-{}-title-link", product.id))
                    .attr("href", format!("inventory-item.html?id={}", product.id))
                    .child(item_name(product)),
                item_description(product),
                pricebar,
            ]),
        ])
}

pub(super) fn checkout_information(store: &SimulatedStore, session: &Session) -> NodeSpec {
    let proceed = {
        let url = store.url("checkout-step-two.html");
        move |scope: &mut Scope<'_>| {
            let missing = [
                ("#first-name", "Error: First Name is required"),
                ("#last-name", "Error: Last Name is required"),
                ("#postal-code", "Error: Postal Code is required"),
            ]
            .into_iter()
            .find(|(field, _)| scope.value_of(field).unwrap_or_default().is_empty());
            match missing {
                Some((_, message)) => show_error(scope, message),
                None => scope.navigate(url.clone()),
            }
        }
    };

    let field = |id: &str, data_test: &str, placeholder: &str| {
        element("div").class("form_group").child(
            element("input")
                .class("input_error form_input")
                .id(id)
                .data_test(data_test)
                .attr("placeholder", placeholder)
                .attr("type", "text"),
        )
    };

    layout(
        store,
        session,
        "Checkout: Your Information",
        None,
        element("div").id("checkout_info_container").child(element("form").children([
            element("div").class("checkout_info").children([
                field("first-name", "firstName", "First Name"),
                field("last-name", "lastName", "Last Name"),
                field("postal-code", "postalCode", "Zip/Postal Code"),
                element("div").class("error-message-container"),
            ]),
            element("div").class("checkout_buttons").children([
                navigate_button("cancel", "Cancel", store.url("cart.html"))
                    .class("btn btn_secondary back btn_medium cart_cancel_link"),
                element("input")
                    .class("submit-button btn btn_primary cart_button btn_action")
                    .id("continue")
                    .data_test("continue")
                    .attr("type", "submit")
                    .value("Continue")
                    .on_click(proceed),
            ]),
        ])),
    )
}

pub(super) fn checkout_overview(store: &SimulatedStore, session: &Session) -> NodeSpec {
    let subtotal: u32 = session.cart.iter().map(|p| p.price_cents).sum();
    let tax = (subtotal * TAX_PERCENT + 50) / 100;

    let finish = {
        let store = store.clone();
        let url = store.url("checkout-complete.html");
        move |scope: &mut Scope<'_>| {
            store.complete_order();
            scope.navigate(url.clone());
        }
    };

    let summary_line = |class: &str, data_test: &str, text: String| {
        element("div").class(class).data_test(data_test).text(text)
    };

    layout(
        store,
        session,
        "Checkout: Overview",
        None,
        element("div").id("checkout_summary_container").child(
            element("div").class("checkout_summary_container").children([
                element("div")
                    .class("cart_list")
                    .data_test("cart-list")
                    .children(
                        session
                            .cart
                            .iter()
                            .map(|product| cart_item(store, session, product, false)),
                    ),
                element("div").class("summary_info").children([
                    summary_line(
                        "summary_subtotal_label",
                        "subtotal-label",
                        format!("Item total: {}", format_price(subtotal)),
                    ),
                    summary_line(
                        "summary_tax_label",
                        "tax-label",
                        format!("Tax: {}", format_price(tax)),
                    ),
                    summary_line(
                        "summary_info_label summary_total_label",
                        "total-label",
                        format!("Total: {}", format_price(subtotal + tax)),
                    ),
                    element("div").class("cart_footer").children([
                        navigate_button("cancel", "Cancel", store.url("inventory.html"))
                            .class("btn btn_secondary back btn_medium cart_cancel_link"),
                        element("button")
                            .class("btn btn_action btn_medium cart_button")
                            .id("finish")
                            .data_test("finish")
                            .text("Finish")
                            .on_click(finish),
                    ]),
                ]),
            ]),
        ),
    )
}

pub(super) fn checkout_complete(store: &SimulatedStore, session: &Session) -> NodeSpec {
    layout(
        store,
        session,
        "Checkout: Complete!",
        None,
        element("div")
            .id("checkout_complete_container")
            .class("checkout_complete_container")
            .data_test("checkout-complete-container")
            .children([
                element("h2")
                    .class("complete-header")
                    .data_test("complete-header")
                    .text("Thank you for your order!"),
                element("div")
                    .class("complete-text")
                    .data_test("complete-text")
                    .text("Your order has been dispatched, and will arrive just as fast as the pony can get there!"),
                navigate_button("back-to-products", "Back Home", store.url("inventory.html"))
                    .class("btn btn_primary btn_small"),
            ]),
    )
}

pub(super) fn external(url: &str) -> NodeSpec {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());
    element("body").child(element("h1").text(host))
}

pub(super) fn not_found() -> NodeSpec {
    element("body").child(element("h1").text("404 Not Found"))
}

fn navigate_button(id: &str, label: &str, url: String) -> NodeSpec {
    element("button")
        .id(id)
        .data_test(id)
        .text(label)
        .on_click(move |scope| scope.navigate(url.clone()))
}

/// Header, side menu and footer around a page's contents.
///
/// `extra` sits next to the title in the secondary header.
fn layout(
    store: &SimulatedStore,
    session: &Session,
    title: &str,
    extra: Option<NodeSpec>,
    contents: NodeSpec,
) -> NodeSpec {
    let mut secondary = element("div")
        .class("header_secondary_container")
        .data_test("secondary-header")
        .child(element("span").class("title").data_test("title").text(title));
    if let Some(extra) = extra {
        secondary = secondary.child(extra);
    }

    element("body").child(
        element("div").id("page_wrapper").class("page_wrapper").children([
            element("div").id("contents_wrapper").children([
                element("div")
                    .id("header_container")
                    .class("header_container")
                    .data_test("header-container")
                    .children([
                        element("div")
                            .class("primary_header")
                            .data_test("primary-header")
                            .children([
                                side_menu(store),
                                element("div")
                                    .class("header_label")
                                    .child(element("div").class("app_logo").text("Swag Labs")),
                                cart_link(session),
                            ]),
                        secondary,
                    ]),
                contents,
            ]),
            footer(),
        ]),
    )
}

fn cart_link(session: &Session) -> NodeSpec {
    let mut link = element("a")
        .class("shopping_cart_link")
        .data_test("shopping-cart-link")
        .attr("href", "cart.html");
    if !session.cart.is_empty() {
        link = link.child(
            element("span")
                .class("shopping_cart_badge")
                .data_test("shopping-cart-badge")
                .text(session.cart.len().to_string()),
        );
    }
    element("div")
        .id("shopping_cart_container")
        .class("shopping_cart_container")
        .child(link)
}

fn open_menu(scope: &mut Scope<'_>) {
    scope.set_hidden(MENU, false);
    scope.set_animating(MENU, true);
    scope.after(MENU_ANIMATION, |scope| {
        scope.set_animating(MENU, false);
    });
}

/// Burger button plus the sliding side menu. The menu starts hidden and
/// only changes through DOM edits, so re-rendering closes it.
fn side_menu(store: &SimulatedStore) -> NodeSpec {
    let logout = {
        let store = store.clone();
        move |scope: &mut Scope<'_>| {
            store.sign_out();
            scope.navigate(store.base_url().to_string());
        }
    };
    // Resetting leaves the current page's buttons as they are
    let reset = {
        let store = store.clone();
        move |scope: &mut Scope<'_>| {
            store.reset();
            scope.remove(BADGE);
        }
    };

    element("div").id("menu_button_container").children([
        element("div")
            .class("bm-burger-button")
            .children([
                element("button").id("react-burger-menu-btn").text("Open Menu"),
                element("img")
                    .class("bm-icon")
                    .data_test("open-menu")
                    .attr("alt", "Open Menu"),
            ])
            .on_click(open_menu),
        element("div").class("bm-menu-wrap").hidden(true).children([
            element("div").class("bm-menu").child(
                element("nav").class("bm-item-list").children([
                    element("a")
                        .id("inventory_sidebar_link")
                        .class("bm-item menu-item")
                        .data_test("inventory-sidebar-link")
                        .attr("href", "inventory.html")
                        .text("All Items"),
                    element("a")
                        .id("about_sidebar_link")
                        .class("bm-item menu-item")
                        .data_test("about-sidebar-link")
                        .attr("href", "https://saucelabs.com/")
                        .text("About"),
                    element("a")
                        .id("logout_sidebar_link")
                        .class("bm-item menu-item")
                        .data_test("logout-sidebar-link")
                        .text("Logout")
                        .on_click(logout),
                    element("a")
                        .id("reset_sidebar_link")
                        .class("bm-item menu-item")
                        .data_test("reset-sidebar-link")
                        .text("Reset App State")
                        .on_click(reset),
                ]),
            ),
            element("div").class("bm-cross-button").child(
                element("button")
                    .id("react-burger-cross-btn")
                    .text("Close Menu")
                    .on_click(|scope| {
                        scope.set_hidden(MENU, true);
                    }),
            ),
        ]),
    ])
}

fn footer() -> NodeSpec {
    let social = |class: &str, data_test: &str, href: &str, label: &str| {
        element("li").class(class).child(
            element("a")
                .data_test(data_test)
                .attr("href", href)
                .attr("target", "_blank")
                .attr("rel", "noreferrer")
                .text(label),
        )
    };
    element("footer").class("footer").data_test("footer").children([
        element("ul").class("social").children([
            social("social_twitter", "social-twitter", "https://x.com/saucelabs", "Twitter"),
            social(
                "social_facebook",
                "social-facebook",
                "https://www.facebook.com/saucelabs",
                "Facebook",
            ),
            social(
                "social_linkedin",
                "social-linkedin",
                "https://www.linkedin.com/company/sauce-labs/",
                "LinkedIn",
            ),
        ]),
        element("div")
            .class("footer_copy")
            .data_test("footer-copy")
            .text("© 2026 Sauce Labs. All Rights Reserved. Terms of Service | Privacy Policy"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use autowait::driver::memory::Document;
    use autowait::protocol::Selector;

    fn count(body: NodeSpec, selector: &str) -> usize {
        Document::new(1, body)
            .resolve(&Selector::parse(selector))
            .unwrap()
            .len()
    }

    #[test]
    fn test_login_error_banner() {
        let store = SimulatedStore::new(&crate::config::SuiteConfig::default());
        assert_eq!(count(login(&store, None), r#"[data-test="error"]"#), 0);
        assert_eq!(count(login(&store, Some("Nope")), r#"[data-test="error"]"#), 1);
    }

    #[test]
    fn test_footer_links_open_new_tabs() {
        assert_eq!(count(footer(), r#".social a[target="_blank"]"#), 3);
    }

    #[test]
    fn test_catalog_slugs_are_unique() {
        let mut slugs: Vec<_> = catalog::PRODUCTS.iter().map(|p| p.slug).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), catalog::PRODUCTS.len());
    }
}
