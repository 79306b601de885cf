// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries. All queries use Diesel DSL.

pub mod audit;
pub mod rbac;
pub mod technicians;
pub mod tickets;
pub mod users;
