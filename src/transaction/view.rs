//! HTML rendering for the transactions page.

use maud::{Markup, html};
use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, loading_spinner,
    },
};

use super::core::{DEFAULT_TRANSACTION_TYPE, Status, Transaction};

pub(crate) fn transactions_view(
    transactions: &[Transaction],
    search_keyword: &str,
    local_offset: UtcOffset,
) -> Markup {
    let aggregate_total: f64 = transactions
        .iter()
        .map(|transaction| transaction.total_amount)
        .sum();
    let row_count = transactions.len();
    let empty_message = if search_keyword.is_empty() {
        "暂无记录"
    } else {
        "没有找到匹配的记录"
    };

    let content = html! {
        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 lg:max-w-6xl lg:w-full lg:mx-auto"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "SM积分记账系统" }

                    a href=(endpoints::EXPORT_TRANSACTIONS) class=(LINK_STYLE)
                    {
                        "导出数据"
                    }

                    a href=(endpoints::LOG_OUT) class=(LINK_STYLE)
                    {
                        "退出登录"
                    }
                }

                section class="rounded bg-gray-50 dark:bg-gray-800 p-6"
                {
                    (create_transaction_form())
                }

                section class="rounded bg-gray-50 dark:bg-gray-800 overflow-hidden p-6"
                {
                    header class="flex justify-between flex-wrap items-end gap-2"
                    {
                        h2 class="text-xl font-semibold" { "交易记录" }

                        (search_form(search_keyword))
                    }

                    div class="overflow-x-auto"
                    {
                        table class="w-full my-2 text-sm text-left rtl:text-right
                            text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "记录 #" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "类型" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "账号" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "积分" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "单价" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "总额" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "用户" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "状态" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "时间" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "操作" }
                                }
                            }

                            tbody
                            {
                                @for (index, transaction) in transactions.iter().enumerate() {
                                    (transaction_row_view(
                                        transaction,
                                        (row_count - index) as i64,
                                        local_offset,
                                    ))
                                }

                                @if transactions.is_empty() {
                                    tr
                                    {
                                        td
                                            colspan="10"
                                            data-empty-state="true"
                                            class="px-6 py-4 text-center"
                                        {
                                            (empty_message)
                                        }
                                    }
                                }
                            }

                            tfoot
                            {
                                tr
                                    class="font-semibold text-gray-900 dark:text-white"
                                    data-aggregate-total="true"
                                {
                                    td colspan="5" class="px-6 py-3 text-right" { "总计" }
                                    td class="px-6 py-3" { (format_currency(aggregate_total)) }
                                    td colspan="4" {}
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("交易记录", &content)
}

/// The entry form for new records.
///
/// The category and status fields arrive pre-filled with their defaults, so
/// the operator usually only fills in the account, points, unit price and
/// user fields.
fn create_transaction_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::TRANSACTIONS_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#type, #account, #points, #unit_price, #username, #status, #submit-button"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            div class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-4"
            {
                input
                    id="type"
                    type="text"
                    name="type"
                    placeholder="积分类型"
                    value=(DEFAULT_TRANSACTION_TYPE)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                input
                    id="account"
                    type="text"
                    name="account"
                    placeholder="账号"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                input
                    id="points"
                    type="number"
                    name="points"
                    placeholder="积分"
                    min="0"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                input
                    id="unit_price"
                    type="number"
                    name="unit_price"
                    placeholder="单价"
                    min="0"
                    step="0.001"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                input
                    id="username"
                    type="text"
                    name="username"
                    placeholder="用户"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                select id="status" name="status" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="已结款" { "已结款" }
                    option value="未结款" selected { "未结款" }
                }
            }

            button
                type="submit"
                id="submit-button"
                tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }

                "添加记录"
            }
        }
    }
}

fn search_form(search_keyword: &str) -> Markup {
    html! {
        form method="get" action=(endpoints::TRANSACTIONS_VIEW) class="flex items-center gap-2"
        {
            input
                id="q"
                type="search"
                name="q"
                value=(search_keyword)
                placeholder="搜索账号、用户或类型"
                class=(FORM_TEXT_INPUT_STYLE);

            button type="submit" class=(BUTTON_SECONDARY_STYLE) { "搜索" }
        }
    }
}

pub(crate) fn transaction_row_view(
    transaction: &Transaction,
    row_number: i64,
    local_offset: UtcOffset,
) -> Markup {
    let status_class = match transaction.status {
        Status::Settled => "text-green-600",
        Status::Unsettled => "text-red-600",
    };
    let edit_endpoint =
        endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_ROW, transaction.id);

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-row="true"
        {
            td class=(TABLE_CELL_STYLE) { (row_number) }
            td class=(TABLE_CELL_STYLE) { (transaction.transaction_type) }
            td class=(TABLE_CELL_STYLE) { (transaction.account) }
            td class=(TABLE_CELL_STYLE) { (transaction.points) }
            td class=(TABLE_CELL_STYLE) { (transaction.unit_price) }
            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.total_amount)) }
            td class=(TABLE_CELL_STYLE) { (transaction.username) }
            td class=(TABLE_CELL_STYLE)
            {
                span class=(status_class) { (transaction.status) }
            }
            td class=(TABLE_CELL_STYLE) { (format_created_at(transaction.created_at, local_offset)) }
            td class=(TABLE_CELL_STYLE)
            {
                button
                    hx-get=(edit_endpoint)
                    hx-target="closest tr"
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "编辑"
                }
            }
        }
    }
}

/// The editing variant of a table row.
///
/// Only the account, points, unit price, user and status cells become inputs.
/// The record number, category, total and timestamp stay read-only, and the
/// save button collects the inputs from the enclosing row.
pub(crate) fn edit_transaction_row_view(
    transaction: &Transaction,
    row_number: i64,
    local_offset: UtcOffset,
) -> Markup {
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_TRANSACTION, transaction.id);

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-edit-row="true"
        {
            td class=(TABLE_CELL_STYLE) { (row_number) }
            td class=(TABLE_CELL_STYLE) { (transaction.transaction_type) }
            td class=(TABLE_CELL_STYLE)
            {
                input
                    type="text"
                    name="account"
                    value=(transaction.account)
                    class=(FORM_TEXT_INPUT_STYLE);
            }
            td class=(TABLE_CELL_STYLE)
            {
                input
                    type="number"
                    name="points"
                    value=(transaction.points)
                    class=(FORM_TEXT_INPUT_STYLE);
            }
            td class=(TABLE_CELL_STYLE)
            {
                input
                    type="number"
                    name="unit_price"
                    value=(transaction.unit_price)
                    step="0.001"
                    class=(FORM_TEXT_INPUT_STYLE);
            }
            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.total_amount)) }
            td class=(TABLE_CELL_STYLE)
            {
                input
                    type="text"
                    name="username"
                    value=(transaction.username)
                    class=(FORM_TEXT_INPUT_STYLE);
            }
            td class=(TABLE_CELL_STYLE)
            {
                select name="status" class="border rounded px-2 py-1 bg-gray-50 dark:bg-gray-700"
                {
                    option value="已结款" selected[transaction.status == Status::Settled]
                    {
                        "已结款"
                    }
                    option value="未结款" selected[transaction.status == Status::Unsettled]
                    {
                        "未结款"
                    }
                }
            }
            td class=(TABLE_CELL_STYLE) { (format_created_at(transaction.created_at, local_offset)) }
            td class=(TABLE_CELL_STYLE)
            {
                button
                    hx-put=(update_endpoint)
                    hx-include="closest tr"
                    hx-target="closest tr"
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "保存"
                }
            }
        }
    }
}

const CREATED_AT_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn format_created_at(created_at: OffsetDateTime, local_offset: UtcOffset) -> String {
    created_at
        .to_offset(local_offset)
        .format(CREATED_AT_FORMAT)
        .unwrap_or_else(|_| created_at.to_string())
}
