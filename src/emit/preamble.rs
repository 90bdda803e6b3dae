//! Fixed header text.
//!
//! Everything that does not depend on a (type, operation) pair: the license
//! and "generated" notice, include guards, backend feature detection, the
//! lock and debug-marker support macros, and the memory barrier.
//!
//! The blocks are templates over `{ns}` / `{NS}` so a different namespace
//! renames every macro and function consistently.

use super::EmitContext;
use crate::config::Variant;
use crate::template::{self, TemplateError};

const LICENSE: &str = "/*
 * Copyright (c) {ns} contributors. All rights reserved.
 *
 * Redistribution and use in source and binary forms, with or without
 * modification, are permitted provided that the following conditions are met:
 *
 * 1. Redistributions of source code must retain the above copyright notice,
 * this list of conditions and the following disclaimer.
 *
 * 2. Redistributions in binary form must reproduce the above copyright notice,
 * this list of conditions and the following disclaimer in the documentation
 * and/or other materials provided with the distribution.
 *
 * THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS \"AS IS\"
 * AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
 * IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
 * ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE
 * LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
 * CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF
 * SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS
 * INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN
 * CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE)
 * ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
 * POSSIBILITY OF SUCH DAMAGE.
 */

/*
 * This file was automatically generated.  Do not edit it.  Edit the
 * operation catalog of atomic-gen instead and regenerate this file with it.
 */
";

const FULL_INCLUDES: &str = "#include <{ns}/base/c/internal/config.h>
#include <{ns}/base/c/internal/atomic/atomic_sizes.h>

#include <stddef.h>
#include <stdint.h>

#if defined {NS}_PLATFORM_ARCH_CXX11
#include <atomic>
#elif defined {NS}_PLATFORM_ARCH_C11
#include <stdatomic.h>
#else
#define {NS}_ATOMIC_INTERNAL_LEGACY
#include <string.h>
#include <{ns}/base/c/internal/macro_helper.h>
#if defined {NS}_PLATFORM_ARCH_X86
#ifdef {NS}_PLATFORM_COMPILER_MSVC
#include <intrin.h>

#ifdef __cplusplus
extern \"C\" {{
#endif

extern void __fastcall {ns}_internal__atomic_memory_barrier_asm();

#ifdef __cplusplus
}}
#endif

#endif
#elif !defined {NS}_PLATFORM_ARCH_ARM
#error \"unsupported platform\"
#endif
#endif
";

const SUPPORT_MACROS: &str = "#if defined {NS}_ATOMIC_INTERNAL_LEGACY || defined {NS}_THREADING_ANALYSIS_MODE
#define {NS}_ATOMIC_INTERNAL_HAS_MUTEX
#include <{ns}/base/c/mutex.h>
#define {NS}_ATOMIC_MUTEX_INIT(mutex) {ns}_mutex_init(&(mutex), {NS}_MUTEX_PLAIN)
#define {NS}_ATOMIC_MUTEX_LOCK(mutex) {ns}_mutex_lock(&(mutex))
#define {NS}_ATOMIC_MUTEX_UNLOCK(mutex) {ns}_mutex_unlock(&(mutex))
#define {NS}_ATOMIC_MUTEX_DESTROY(mutex) {ns}_mutex_destroy(&(mutex))
#else
#define {NS}_ATOMIC_MUTEX_INIT(mutex) ((void)0)
#define {NS}_ATOMIC_MUTEX_LOCK(mutex) ((void)0)
#define {NS}_ATOMIC_MUTEX_UNLOCK(mutex) ((void)0)
#define {NS}_ATOMIC_MUTEX_DESTROY(mutex) ((void)0)
#endif

#ifdef {NS}_DEBUG
#include <assert.h>
#define {NS}_ATOMIC_INTERNAL_MARKER_LIVE 0x4C495645u
#define {NS}_ATOMIC_INTERNAL_MARKER_DEAD 0x44454144u
#define {NS}_ATOMIC_INIT_CHECK(variable) \\
  assert((variable)->marker == {NS}_ATOMIC_INTERNAL_MARKER_LIVE)
#define {NS}_ATOMIC_INIT_MARKER(variable) \\
  ((variable)->marker = {NS}_ATOMIC_INTERNAL_MARKER_LIVE)
#define {NS}_ATOMIC_DESTROY_MARKER(variable) \\
  ((variable)->marker = {NS}_ATOMIC_INTERNAL_MARKER_DEAD)
#else
#define {NS}_ATOMIC_INIT_CHECK(variable) ((void)0)
#define {NS}_ATOMIC_INIT_MARKER(variable) ((void)0)
#define {NS}_ATOMIC_DESTROY_MARKER(variable) ((void)0)
#endif
";

const FULL_BARRIER: &str = "{NS}_PLATFORM_INLINE void {ns}_atomic_memory_barrier(void) {{
#if defined {NS}_PLATFORM_ARCH_CXX11
  std::atomic_thread_fence(std::memory_order_seq_cst);
#elif defined {NS}_PLATFORM_ARCH_C11
  atomic_thread_fence(memory_order_seq_cst);
#elif defined {NS}_PLATFORM_ARCH_X86
#ifdef {NS}_PLATFORM_COMPILER_MSVC
  _ReadWriteBarrier();
  {ns}_internal__atomic_memory_barrier_asm();
  _ReadWriteBarrier();
#else
  __asm__ __volatile__ (\"mfence\" : : : \"memory\");
#endif
#elif defined {NS}_PLATFORM_ARCH_ARM
  __asm__ __volatile__ (\"dmb\" : : : \"memory\");
#endif
}}
";

const STANDARD_INCLUDES: &str = "#include <{ns}/base/c/internal/config.h>
#include <{ns}/base/c/internal/atomic/atomic_sizes.h>

#if defined {NS}_PLATFORM_ARCH_CXX11
#include <atomic>
#include <cstddef>
#include <cstdint>
#elif defined {NS}_PLATFORM_ARCH_C11
#include <stdatomic.h>
#include <stddef.h>
#include <stdint.h>
#else
#error \"Not available for selected C or C++ standard\"
#endif

#define {NS}_64_BIT_ATOMIC_AVAILABLE
";

const STANDARD_BARRIER: &str = "{NS}_PLATFORM_INLINE void {ns}_atomic_memory_barrier(void) {{
#if defined {NS}_PLATFORM_ARCH_CXX11
  std::atomic_thread_fence(std::memory_order_seq_cst);
#elif defined {NS}_PLATFORM_ARCH_C11
  atomic_thread_fence(memory_order_seq_cst);
#endif
}}
";

/// License header and "do not edit" notice.
pub fn license(ctx: &EmitContext) -> Result<String, TemplateError> {
    template::render("license", LICENSE, &ctx.namespace_bindings())
}

/// Everything up to and including the memory barrier.
pub fn preamble(ctx: &EmitContext, guard: &str) -> Result<String, TemplateError> {
    let bindings = ctx.namespace_bindings();
    let mut out = license(ctx)?;
    out.push_str(&format!("\n#ifndef {guard}\n#define {guard}\n\n", guard = guard));
    match ctx.variant {
        Variant::Full => {
            out.push_str(&template::render("includes", FULL_INCLUDES, &bindings)?);
            out.push('\n');
            out.push_str(&template::render("support macros", SUPPORT_MACROS, &bindings)?);
            out.push('\n');
            out.push_str(&template::render("memory barrier", FULL_BARRIER, &bindings)?);
        }
        Variant::StandardOnly => {
            out.push_str(&template::render("includes", STANDARD_INCLUDES, &bindings)?);
            out.push('\n');
            out.push_str(&template::render("memory barrier", STANDARD_BARRIER, &bindings)?);
        }
    }
    Ok(out)
}

/// Closing include guard.
pub fn epilogue(guard: &str) -> String {
    format!("#endif //{}\n", guard)
}
