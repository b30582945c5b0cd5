// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod dispatch;
pub mod evaluate;
pub mod extract;
pub mod logging;
pub mod session;
